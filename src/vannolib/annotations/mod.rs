mod label_file;
mod voc_io;

pub use label_file::{LabelFile, LABEL_FILE_EXT};
pub use voc_io::XML_EXT;

use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use crate::{
    domain::{DocColors, ImageShape, Shape},
    file_util,
    result::{io_to_vn, trace_ok_warn, VnError, VnResult},
};

/// Persisted annotation of one image.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct AnnotationRecord {
    pub image_path: String,
    pub image_shape: ImageShape,
    pub shapes: Vec<Shape>,
    /// A human has confirmed the annotation.
    pub verified: bool,
}
impl AnnotationRecord {
    /// Equality with point coordinates compared up to single precision.
    pub fn is_close_to(&self, other: &AnnotationRecord) -> bool {
        self.image_path == other.image_path
            && self.image_shape == other.image_shape
            && self.verified == other.verified
            && self.shapes.len() == other.shapes.len()
            && self.shapes.iter().zip(other.shapes.iter()).all(|(s1, s2)| {
                s1.label == s2.label
                    && s1.line_color == s2.line_color
                    && s1.fill_color == s2.fill_color
                    && s1.difficult == s2.difficult
                    && s1.points.len() == s2.points.len()
                    && s1
                        .points
                        .iter()
                        .zip(s2.points.iter())
                        .all(|(p1, p2)| p1.is_close_to(*p2))
            })
    }
}

/// The on-disk format is a persistent mode, it is never guessed from the content.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnnotationFormat {
    #[default]
    PascalVoc,
    LabelFile,
}
impl AnnotationFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AnnotationFormat::PascalVoc => XML_EXT,
            AnnotationFormat::LabelFile => LABEL_FILE_EXT,
        }
    }
}

pub fn is_label_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(&LABEL_FILE_EXT[1..]))
        == Some(true)
}

/// Format of an existing annotation file judged by its extension.
pub fn format_of<P: AsRef<Path>>(path: P) -> AnnotationFormat {
    if is_label_file(path) {
        AnnotationFormat::LabelFile
    } else {
        AnnotationFormat::PascalVoc
    }
}

/// Annotation file of an image, i.e., the image's file name with the annotation extension, in
/// `save_dir` if given and next to the image otherwise.
pub fn annotation_path<P>(
    image_path: P,
    save_dir: Option<&Path>,
    format: AnnotationFormat,
) -> VnResult<PathBuf>
where
    P: AsRef<Path>,
{
    file_util::with_extension_in(image_path, save_dir, format.extension())
}

/// Reads an annotation. A missing file is an error of kind `NotFound`, an unparsable one of kind
/// `InvalidFormat`.
pub fn load<P>(path: P, format: AnnotationFormat) -> VnResult<AnnotationRecord>
where
    P: AsRef<Path> + Debug,
{
    let s = file_util::read_to_string(&path)?;
    let record = match format {
        AnnotationFormat::PascalVoc => voc_io::from_xml_str(&s),
        AnnotationFormat::LabelFile => label_file::from_json_str(&s).map(|lf| lf.record),
    }?;
    info!("loaded {} shapes from {path:?}", record.shapes.len());
    Ok(record)
}

/// Reads a label file including the image bytes and document colors stored in it.
pub fn load_label_file<P>(path: P) -> VnResult<LabelFile>
where
    P: AsRef<Path> + Debug,
{
    let s = file_util::read_to_string(&path)?;
    label_file::from_json_str(&s)
}

/// Writes the annotation all-or-nothing, creating the destination folder if necessary. The verified
/// flag of the record is written as is. Label files get the default document colors.
pub fn save<P>(path: P, record: &AnnotationRecord, format: AnnotationFormat) -> VnResult<()>
where
    P: AsRef<Path> + Debug,
{
    save_with_colors(path, record, format, DocColors::default())
}

/// Like [`save`](save) with the document colors that label files store. Pascal VOC files only
/// keep the colors of the shapes.
pub fn save_with_colors<P>(
    path: P,
    record: &AnnotationRecord,
    format: AnnotationFormat,
    colors: DocColors,
) -> VnResult<()>
where
    P: AsRef<Path> + Debug,
{
    for shape in &record.shapes {
        shape.validate()?;
    }
    let content = match format {
        AnnotationFormat::PascalVoc => voc_io::to_xml_string(record)?,
        AnnotationFormat::LabelFile => {
            let image_data = trace_ok_warn(
                fs::read(&record.image_path).map_err(|e| io_to_vn(&record.image_path, e)),
            );
            label_file::to_json_string(record, image_data.as_deref(), colors)?
        }
    };
    file_util::write_atomic(&path, content)?;
    info!("saved {} shapes to {path:?}", record.shapes.len());
    Ok(())
}

/// Places to look for an existing annotation of an image, tried in order by [`lookup`](lookup).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnnoLookup {
    /// The annotation file in the given save folder.
    SaveDir(PathBuf),
    /// The annotation file next to the image.
    BesideImage,
    /// The annotation file of another image, typically the previously opened one. Found records
    /// are returned unverified.
    PreviousImage {
        image_path: String,
        save_dir: Option<PathBuf>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum LookupOutcome {
    Found {
        record: AnnotationRecord,
        source: PathBuf,
        strategy: AnnoLookup,
    },
    Absent,
    Invalid {
        error: VnError,
        source: PathBuf,
    },
}

fn lookup_path(image_path: &str, strategy: &AnnoLookup, format: AnnotationFormat) -> VnResult<PathBuf> {
    match strategy {
        AnnoLookup::SaveDir(save_dir) => annotation_path(image_path, Some(save_dir), format),
        AnnoLookup::BesideImage => annotation_path(image_path, None, format),
        AnnoLookup::PreviousImage {
            image_path: prev_path,
            save_dir,
        } => annotation_path(prev_path, save_dir.as_deref(), format),
    }
}

/// Tries the strategies in order. Missing files lead to the next strategy, an invalid file stops
/// the search since it must be surfaced instead of being shadowed by a fallback.
pub fn lookup(image_path: &str, strategies: &[AnnoLookup], format: AnnotationFormat) -> LookupOutcome {
    for strategy in strategies {
        let source = match lookup_path(image_path, strategy, format) {
            Ok(p) => p,
            Err(e) => {
                warn!("skipping lookup {strategy:?} for {image_path} due to {e:?}");
                continue;
            }
        };
        match load(&source, format) {
            Ok(mut record) => {
                if let AnnoLookup::PreviousImage { .. } = strategy {
                    warn!("using annotation of previous image {source:?} for {image_path}");
                    record.verified = false;
                }
                return LookupOutcome::Found {
                    record,
                    source,
                    strategy: strategy.clone(),
                };
            }
            Err(e) if e.is_not_found() => (),
            Err(error) => return LookupOutcome::Invalid { error, source },
        }
    }
    LookupOutcome::Absent
}

#[cfg(test)]
use {
    crate::{
        defer_folder_removal,
        domain::PtF,
        file_util::DEFAULT_TMPDIR,
        result::ErrorKind,
    },
    uuid::Uuid,
};

#[cfg(test)]
fn make_record(image_path: &str) -> AnnotationRecord {
    AnnotationRecord {
        image_path: image_path.to_string(),
        image_shape: ImageShape::new(64, 48, 3),
        shapes: vec![
            Shape::new_box("a", PtF::new(1.0, 2.0), PtF::new(30.5, 40.25)),
            Shape::new("b", vec![PtF::new(3.0, 3.0)]),
        ],
        verified: true,
    }
}

#[test]
fn test_is_label_file() {
    assert!(is_label_file("a/b.lif"));
    assert!(is_label_file("a/b.LIF"));
    assert!(!is_label_file("a/b.xml"));
    assert!(!is_label_file("a/lif"));
    assert_eq!(format_of("a/b.lif"), AnnotationFormat::LabelFile);
    assert_eq!(format_of("a/b.xml"), AnnotationFormat::PascalVoc);
}

#[test]
fn test_save_load() {
    let folder = DEFAULT_TMPDIR.join(format!("anno_{}", Uuid::new_v4()));
    defer_folder_removal!(&folder);
    let image_path = folder.join("img").join("x.png");
    let image_path = image_path.to_str().unwrap();
    for format in [AnnotationFormat::PascalVoc, AnnotationFormat::LabelFile] {
        let record = make_record(image_path);
        let save_dir = folder.join("out").join("deeper");
        let path = annotation_path(image_path, Some(save_dir.as_path()), format).unwrap();
        assert_eq!(
            path.extension().and_then(|e| e.to_str()),
            Some(&format.extension()[1..])
        );
        save(&path, &record, format).unwrap();
        let loaded = load(&path, format).unwrap();
        assert!(loaded.is_close_to(&record));

        let mut unverified = record.clone();
        unverified.verified = false;
        save(&path, &unverified, format).unwrap();
        assert!(!load(&path, format).unwrap().verified);
    }
}

#[test]
fn test_load_missing_and_invalid() {
    let folder = DEFAULT_TMPDIR.join(format!("anno_{}", Uuid::new_v4()));
    defer_folder_removal!(&folder);
    let missing = folder.join("nope.xml");
    let e = load(&missing, AnnotationFormat::PascalVoc).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::NotFound);
    let broken = folder.join("broken.xml");
    file_util::write_atomic(&broken, "<annotation><size>").unwrap();
    let e = load(&broken, AnnotationFormat::PascalVoc).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidFormat);
}

#[test]
fn test_save_rejects_empty_shape() {
    let folder = DEFAULT_TMPDIR.join(format!("anno_{}", Uuid::new_v4()));
    defer_folder_removal!(&folder);
    let path = folder.join("x.xml");
    let mut record = make_record("x.png");
    record.shapes.push(Shape::new("empty", vec![]));
    assert!(save(&path, &record, AnnotationFormat::PascalVoc).is_err());
    assert!(!path.exists());
}

#[test]
fn test_lookup() {
    let folder = DEFAULT_TMPDIR.join(format!("anno_{}", Uuid::new_v4()));
    defer_folder_removal!(&folder);
    let format = AnnotationFormat::PascalVoc;
    let save_dir = folder.join("save");
    let img1 = folder.join("1.png").to_str().unwrap().to_string();
    let img2 = folder.join("2.png").to_str().unwrap().to_string();
    let strategies = [
        AnnoLookup::SaveDir(save_dir.clone()),
        AnnoLookup::PreviousImage {
            image_path: img1.clone(),
            save_dir: Some(save_dir.clone()),
        },
    ];
    assert_eq!(lookup(&img2, &strategies, format), LookupOutcome::Absent);

    save(
        annotation_path(&img1, Some(save_dir.as_path()), format).unwrap(),
        &make_record(&img1),
        format,
    )
    .unwrap();
    match lookup(&img2, &strategies, format) {
        LookupOutcome::Found {
            record, strategy, ..
        } => {
            assert!(!record.verified);
            assert_eq!(record.shapes.len(), 2);
            assert!(matches!(strategy, AnnoLookup::PreviousImage { .. }));
        }
        o => panic!("unexpected {o:?}"),
    }
    // without the fallback strategy the previous image's annotation is not used
    assert_eq!(
        lookup(&img2, &strategies[..1], format),
        LookupOutcome::Absent
    );

    let path2 = annotation_path(&img2, Some(save_dir.as_path()), format).unwrap();
    file_util::write_atomic(&path2, "garbage").unwrap();
    match lookup(&img2, &strategies, format) {
        LookupOutcome::Invalid { error, source } => {
            assert_eq!(error.kind(), ErrorKind::InvalidFormat);
            assert_eq!(source, path2);
        }
        o => panic!("unexpected {o:?}"),
    }
}
