use uuid::Uuid;

use crate::{
    annotations::AnnotationRecord,
    domain::{ImageShape, PtF, Shape},
    result::{ErrorKind, VnResult},
    vnerr,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DocState {
    #[default]
    NoImageOpen,
    Clean,
    Dirty,
}

/// A shape of the open image together with a stable id that presentation layers use to refer
/// to it.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnoEntry {
    pub id: Uuid,
    pub shape: Shape,
    pub visible: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotationTable {
    entries: Vec<AnnoEntry>,
}

impl AnnotationTable {
    pub fn from_shapes(shapes: Vec<Shape>) -> Self {
        let mut table = Self::default();
        for shape in shapes {
            table.add(shape);
        }
        table
    }
    pub fn add(&mut self, shape: Shape) -> Uuid {
        let id = Uuid::new_v4();
        self.entries.push(AnnoEntry {
            id,
            shape,
            visible: true,
        });
        id
    }
    pub fn get(&self, id: Uuid) -> Option<&AnnoEntry> {
        self.entries.iter().find(|e| e.id == id)
    }
    fn get_mut(&mut self, id: Uuid) -> VnResult<&mut AnnoEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| vnerr!(ErrorKind::NotFound; "no shape with id {}", id))
    }
    pub fn remove(&mut self, id: Uuid) -> Option<AnnoEntry> {
        let idx = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(idx))
    }
    pub fn iter(&self) -> impl Iterator<Item = &AnnoEntry> {
        self.entries.iter()
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn shapes(&self) -> Vec<Shape> {
        self.entries.iter().map(|e| e.shape.clone()).collect()
    }
}

/// The image that is currently open and its unsaved edits.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    image_path: Option<String>,
    image_shape: ImageShape,
    table: AnnotationTable,
    verified: bool,
    state: DocState,
}

impl Document {
    pub fn open(image_path: &str, image_shape: ImageShape, record: Option<AnnotationRecord>) -> Self {
        let (shapes, verified) = match record {
            Some(r) => (r.shapes, r.verified),
            None => (vec![], false),
        };
        Document {
            image_path: Some(image_path.to_string()),
            image_shape,
            table: AnnotationTable::from_shapes(shapes),
            verified,
            state: DocState::Clean,
        }
    }

    pub fn close(&mut self) {
        *self = Self::default();
    }

    pub fn state(&self) -> DocState {
        self.state
    }
    pub fn is_dirty(&self) -> bool {
        self.state == DocState::Dirty
    }
    pub fn image_path(&self) -> Option<&str> {
        self.image_path.as_deref()
    }
    pub fn image_shape(&self) -> ImageShape {
        self.image_shape
    }
    pub fn table(&self) -> &AnnotationTable {
        &self.table
    }
    pub fn verified(&self) -> bool {
        self.verified
    }

    fn edit<T>(&mut self, f: impl FnOnce(&mut Self) -> VnResult<T>) -> VnResult<T> {
        if self.state == DocState::NoImageOpen {
            return Err(vnerr!("no image open"));
        }
        let res = f(self)?;
        self.state = DocState::Dirty;
        Ok(res)
    }

    pub fn add_shape(&mut self, shape: Shape) -> VnResult<Uuid> {
        shape.validate()?;
        self.edit(|doc| Ok(doc.table.add(shape)))
    }
    pub fn remove(&mut self, id: Uuid) -> VnResult<Shape> {
        self.edit(|doc| {
            doc.table
                .remove(id)
                .map(|e| e.shape)
                .ok_or_else(|| vnerr!(ErrorKind::NotFound; "no shape with id {}", id))
        })
    }
    /// Renames and recolors the outline. Setting the same label again is no edit.
    pub fn set_label(&mut self, id: Uuid, label: &str) -> VnResult<()> {
        let label = label.trim();
        if label.is_empty() {
            return Err(vnerr!(ErrorKind::InvalidFormat; "shape {} needs a label", id));
        }
        if self.table.get(id).map(|e| e.shape.label.as_str()) == Some(label) {
            return Ok(());
        }
        self.edit(|doc| {
            doc.table.get_mut(id)?.shape.relabel(label);
            Ok(())
        })
    }
    pub fn set_difficult(&mut self, id: Uuid, difficult: bool) -> VnResult<()> {
        self.edit(|doc| {
            doc.table.get_mut(id)?.shape.difficult = difficult;
            Ok(())
        })
    }
    pub fn set_points(&mut self, id: Uuid, points: Vec<PtF>) -> VnResult<()> {
        if points.is_empty() {
            return Err(vnerr!(ErrorKind::InvalidFormat; "shape {} needs at least one point", id));
        }
        self.edit(|doc| {
            doc.table.get_mut(id)?.shape.points = points;
            Ok(())
        })
    }
    pub fn set_verified(&mut self, verified: bool) -> VnResult<()> {
        self.edit(|doc| {
            doc.verified = verified;
            Ok(())
        })
    }
    /// Visibility is presentation state and does not make the document dirty.
    pub fn set_visible(&mut self, id: Uuid, visible: bool) -> VnResult<()> {
        self.table.get_mut(id)?.visible = visible;
        Ok(())
    }

    pub fn to_record(&self) -> VnResult<AnnotationRecord> {
        let image_path = self
            .image_path
            .as_ref()
            .ok_or_else(|| vnerr!("no image open"))?;
        Ok(AnnotationRecord {
            image_path: image_path.clone(),
            image_shape: self.image_shape,
            shapes: self.table.shapes(),
            verified: self.verified,
        })
    }

    pub fn mark_saved(&mut self) {
        if self.state == DocState::Dirty {
            self.state = DocState::Clean;
        }
    }
}

#[test]
fn test_document_states() {
    use crate::domain::color_from_label;
    let mut doc = Document::default();
    assert_eq!(doc.state(), DocState::NoImageOpen);
    let shape = Shape::new_box("a", PtF::new(0.0, 0.0), PtF::new(1.0, 1.0));
    assert!(doc.add_shape(shape.clone()).is_err());

    let mut doc = Document::open("x.png", ImageShape::new(4, 4, 3), None);
    assert_eq!(doc.state(), DocState::Clean);
    let id = doc.add_shape(shape).unwrap();
    assert!(doc.is_dirty());
    doc.mark_saved();
    assert_eq!(doc.state(), DocState::Clean);

    doc.set_label(id, "a").unwrap();
    assert_eq!(doc.state(), DocState::Clean);
    doc.set_visible(id, false).unwrap();
    assert_eq!(doc.state(), DocState::Clean);
    doc.set_label(id, " a ").unwrap();
    assert_eq!(doc.state(), DocState::Clean);
    assert_eq!(
        doc.set_label(id, "  ").unwrap_err().kind(),
        ErrorKind::InvalidFormat
    );
    assert_eq!(doc.state(), DocState::Clean);
    doc.set_label(id, "b").unwrap();
    assert!(doc.is_dirty());
    let entry = doc.table().get(id).unwrap();
    assert_eq!(entry.shape.line_color, color_from_label("b"));
    assert!(!entry.visible);

    assert!(doc.set_points(id, vec![]).is_err());
    doc.set_difficult(id, true).unwrap();
    doc.set_verified(true).unwrap();
    let record = doc.to_record().unwrap();
    assert!(record.verified);
    assert!(record.shapes[0].difficult);

    assert_eq!(
        doc.remove(Uuid::new_v4()).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    doc.remove(id).unwrap();
    assert!(doc.table().is_empty());
    doc.close();
    assert_eq!(doc.state(), DocState::NoImageOpen);
}

#[test]
fn test_ids_are_stable() {
    let shapes = vec![
        Shape::new("a", vec![PtF::new(0.0, 0.0)]),
        Shape::new("b", vec![PtF::new(1.0, 1.0)]),
        Shape::new("c", vec![PtF::new(2.0, 2.0)]),
    ];
    let mut table = AnnotationTable::from_shapes(shapes);
    let ids = table.iter().map(|e| e.id).collect::<Vec<_>>();
    table.remove(ids[1]);
    assert_eq!(table.get(ids[2]).unwrap().shape.label, "c");
    assert_eq!(table.len(), 2);
}
