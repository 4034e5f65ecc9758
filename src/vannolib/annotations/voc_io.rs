//! Pascal VOC xml files as written by labelImg style tools, extended by exact polygon vertices and
//! explicit colors. Files without the extension elements are read as plain boxes.
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::AnnotationRecord;
use crate::{
    domain::{color_from_label, BbF, ImageShape, PtF, Rgba, Shape},
    file_util,
    result::{to_vn, to_vn_kind, ErrorKind, VnResult},
    util::version_label,
    vnerr,
};

pub const XML_EXT: &str = ".xml";
const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n";
const VERIFIED_YES: &str = "yes";
const DEFAULT_POSE: &str = "Unspecified";
const DEFAULT_DATABASE: &str = "Unknown";

fn default_pose() -> String {
    DEFAULT_POSE.to_string()
}
fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct VocSource {
    #[serde(default = "default_database")]
    database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    creator: Option<String>,
}
impl Default for VocSource {
    fn default() -> Self {
        VocSource {
            database: default_database(),
            creator: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct VocSize {
    width: u32,
    height: u32,
    #[serde(default)]
    depth: u8,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct VocBndBox {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct VocPt {
    x: f64,
    y: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct VocPolygon {
    #[serde(rename = "pt", default)]
    pts: Vec<VocPt>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
struct VocRgba {
    #[serde(rename = "@r")]
    r: u8,
    #[serde(rename = "@g")]
    g: u8,
    #[serde(rename = "@b")]
    b: u8,
    #[serde(rename = "@a")]
    a: u8,
}
impl From<Rgba> for VocRgba {
    fn from(c: Rgba) -> Self {
        VocRgba {
            r: c.r(),
            g: c.g(),
            b: c.b(),
            a: c.a(),
        }
    }
}
impl From<VocRgba> for Rgba {
    fn from(c: VocRgba) -> Self {
        Rgba::new(c.r, c.g, c.b, c.a)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct VocObject {
    name: String,
    #[serde(default = "default_pose")]
    pose: String,
    #[serde(default)]
    truncated: u8,
    #[serde(default)]
    difficult: u8,
    bndbox: Option<VocBndBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    polygon: Option<VocPolygon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line_color: Option<VocRgba>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fill_color: Option<VocRgba>,
}

impl VocObject {
    fn from_shape(shape: &Shape, image_shape: ImageShape) -> VnResult<Self> {
        shape.validate()?;
        let bb = shape.bb()?;
        let bndbox = VocBndBox {
            xmin: bb.x_min.round(),
            ymin: bb.y_min.round(),
            xmax: bb.x_max.round(),
            ymax: bb.y_max.round(),
        };
        let truncated = bndbox.xmin <= 1.0
            || bndbox.ymin <= 1.0
            || bndbox.xmax >= image_shape.w as f64
            || bndbox.ymax >= image_shape.h as f64;
        Ok(VocObject {
            name: shape.label.clone(),
            pose: default_pose(),
            truncated: u8::from(truncated),
            difficult: u8::from(shape.difficult),
            bndbox: Some(bndbox),
            polygon: Some(VocPolygon {
                pts: shape
                    .points
                    .iter()
                    .map(|p| VocPt { x: p.x, y: p.y })
                    .collect(),
            }),
            line_color: Some(shape.line_color.into()),
            fill_color: Some(shape.fill_color.into()),
        })
    }

    fn into_shape(self) -> VnResult<Shape> {
        let points = match (self.polygon, self.bndbox) {
            (Some(polygon), _) if !polygon.pts.is_empty() => polygon
                .pts
                .into_iter()
                .map(|pt| PtF::new(pt.x, pt.y))
                .collect(),
            (_, Some(bb)) => BbF {
                x_min: bb.xmin,
                y_min: bb.ymin,
                x_max: bb.xmax,
                y_max: bb.ymax,
            }
            .corners()
            .to_vec(),
            _ => {
                return Err(
                    vnerr!(ErrorKind::InvalidFormat; "object '{}' has neither bndbox nor polygon", self.name),
                );
            }
        };
        let label_color = color_from_label(&self.name);
        let shape = Shape {
            line_color: self.line_color.map(Rgba::from).unwrap_or(label_color),
            fill_color: self.fill_color.map(Rgba::from).unwrap_or(label_color),
            label: self.name,
            points,
            difficult: self.difficult != 0,
        };
        shape.validate()?;
        Ok(shape)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename = "annotation")]
struct VocAnnotation {
    #[serde(rename = "@verified", default, skip_serializing_if = "Option::is_none")]
    verified: Option<String>,
    #[serde(default)]
    folder: String,
    #[serde(default)]
    filename: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    source: VocSource,
    size: VocSize,
    #[serde(default)]
    segmented: u8,
    #[serde(rename = "object", default)]
    objects: Vec<VocObject>,
}

impl VocAnnotation {
    fn from_record(record: &AnnotationRecord) -> VnResult<Self> {
        let image_path = Path::new(&record.image_path);
        let folder = file_util::parent_folder_name(image_path).unwrap_or("");
        let filename = file_util::to_name_str(image_path)?;
        let objects = record
            .shapes
            .iter()
            .map(|s| VocObject::from_shape(s, record.image_shape))
            .collect::<VnResult<Vec<_>>>()?;
        Ok(VocAnnotation {
            verified: record.verified.then(|| VERIFIED_YES.to_string()),
            folder: folder.to_string(),
            filename: filename.to_string(),
            path: record.image_path.clone(),
            source: VocSource {
                database: default_database(),
                creator: Some(version_label()),
            },
            size: VocSize {
                width: record.image_shape.w,
                height: record.image_shape.h,
                depth: record.image_shape.depth,
            },
            segmented: 0,
            objects,
        })
    }

    fn into_record(self) -> VnResult<AnnotationRecord> {
        let image_path = if self.path.is_empty() {
            self.filename
        } else {
            self.path
        };
        let shapes = self
            .objects
            .into_iter()
            .map(VocObject::into_shape)
            .collect::<VnResult<Vec<_>>>()?;
        Ok(AnnotationRecord {
            image_path,
            image_shape: ImageShape::new(self.size.width, self.size.height, self.size.depth),
            shapes,
            verified: self.verified.as_deref() == Some(VERIFIED_YES),
        })
    }
}

pub fn to_xml_string(record: &AnnotationRecord) -> VnResult<String> {
    let anno = VocAnnotation::from_record(record)?;
    let mut buffer = String::from(XML_DECL);
    let mut ser = quick_xml::se::Serializer::new(&mut buffer);
    ser.indent(' ', 4);
    anno.serialize(ser).map_err(to_vn)?;
    buffer.push('\n');
    Ok(buffer)
}

pub fn from_xml_str(s: &str) -> VnResult<AnnotationRecord> {
    let anno: VocAnnotation =
        quick_xml::de::from_str(s).map_err(to_vn_kind(ErrorKind::InvalidFormat))?;
    anno.into_record()
}

#[cfg(test)]
fn make_record() -> AnnotationRecord {
    let mut s1 = Shape::new_box("car", PtF::new(10.0, 20.5), PtF::new(110.25, 80.0));
    s1.difficult = true;
    let mut s2 = Shape::new(
        "person",
        vec![
            PtF::new(1.5, 2.5),
            PtF::new(3.125, 99.75),
            PtF::new(50.0, 33.333),
        ],
    );
    s2.fill_color = Rgba::new(1, 2, 3, 4);
    AnnotationRecord {
        image_path: "/data/1034/img_0001.jpg".to_string(),
        image_shape: ImageShape::new(320, 240, 3),
        shapes: vec![s1, s2],
        verified: true,
    }
}

#[test]
fn test_xml_roundtrip() {
    let record = make_record();
    let xml = to_xml_string(&record).unwrap();
    assert!(xml.starts_with(XML_DECL));
    assert!(xml.contains("verified=\"yes\""));
    assert!(xml.contains("<folder>1034</folder>"));
    assert!(xml.contains("<difficult>1</difficult>"));
    let read = from_xml_str(&xml).unwrap();
    assert!(read.is_close_to(&record), "{read:?} vs {record:?}");
    assert_eq!(read.shapes[1].fill_color, Rgba::new(1, 2, 3, 4));

    let mut unverified = record.clone();
    unverified.verified = false;
    unverified.shapes.clear();
    let xml = to_xml_string(&unverified).unwrap();
    assert!(!xml.contains("verified"));
    assert_eq!(from_xml_str(&xml).unwrap(), unverified);
}

#[test]
fn test_xml_labels_exact() {
    let mut record = make_record();
    record.shapes[0] = Shape::new_box("  traffic  light ", PtF::new(1.0, 2.0), PtF::new(3.0, 4.0));
    record.shapes[1].label = "a\nb & <c>".to_string();
    let read = from_xml_str(&to_xml_string(&record).unwrap()).unwrap();
    assert!(read.is_close_to(&record), "{read:?} vs {record:?}");
    assert_eq!(read.shapes[0].label, "traffic  light");
    assert_eq!(read.shapes[1].label, "a\nb & <c>");

    // a label that xml text cannot carry is rejected instead of being changed on the way
    record.shapes[0].label = "  car  ".to_string();
    let e = to_xml_string(&record).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidFormat);
}

#[test]
fn test_plain_voc() {
    let xml = r#"<?xml version="1.0"?>
<annotation>
    <folder>imgs</folder>
    <filename>a.png</filename>
    <size><width>100</width><height>50</height><depth>3</depth></size>
    <segmented>0</segmented>
    <object>
        <name>dog</name>
        <pose>Unspecified</pose>
        <truncated>0</truncated>
        <difficult>0</difficult>
        <bndbox><xmin>5</xmin><ymin>6</ymin><xmax>20</xmax><ymax>30</ymax></bndbox>
    </object>
</annotation>"#;
    let record = from_xml_str(xml).unwrap();
    assert_eq!(record.image_path, "a.png");
    assert!(!record.verified);
    assert_eq!(record.shapes.len(), 1);
    let dog = &record.shapes[0];
    assert_eq!(dog.points[0], PtF::new(5.0, 6.0));
    assert_eq!(dog.points[2], PtF::new(20.0, 30.0));
    assert_eq!(dog.line_color, color_from_label("dog"));
}

#[test]
fn test_invalid_xml() {
    let e = from_xml_str("<annotation><size><width>x</width></size>").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidFormat);
    let no_size = "<annotation><filename>a.png</filename></annotation>";
    assert_eq!(
        from_xml_str(no_size).unwrap_err().kind(),
        ErrorKind::InvalidFormat
    );
    let no_box = r#"<annotation>
        <size><width>1</width><height>1</height><depth>3</depth></size>
        <object><name>x</name></object>
    </annotation>"#;
    assert_eq!(
        from_xml_str(no_box).unwrap_err().kind(),
        ErrorKind::InvalidFormat
    );
}
