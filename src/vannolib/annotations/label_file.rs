use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use super::AnnotationRecord;
use crate::{
    domain::{DocColors, ImageShape, Rgba, Shape},
    result::{to_vn, to_vn_kind, ErrorKind, VnResult},
    util::version_label,
};

pub const LABEL_FILE_EXT: &str = ".lif";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct LabelFileData {
    #[serde(default)]
    version: Option<String>,
    image_path: String,
    /// Base64 encoded bytes of the image such that the label file is self-contained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_data: Option<String>,
    image_shape: ImageShape,
    verified: bool,
    /// Document colors at the time of saving.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line_color: Option<Rgba>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fill_color: Option<Rgba>,
    shapes: Vec<Shape>,
}

/// Content of a label file next to the annotation itself.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelFile {
    pub record: AnnotationRecord,
    pub image_data: Option<Vec<u8>>,
    /// `None` for files written without document colors.
    pub colors: Option<DocColors>,
}

pub fn to_json_string(
    record: &AnnotationRecord,
    image_data: Option<&[u8]>,
    colors: DocColors,
) -> VnResult<String> {
    let data = LabelFileData {
        version: Some(version_label()),
        image_path: record.image_path.clone(),
        image_data: image_data.map(|d| STANDARD.encode(d)),
        image_shape: record.image_shape,
        verified: record.verified,
        line_color: Some(colors.line_color),
        fill_color: Some(colors.fill_color),
        shapes: record.shapes.clone(),
    };
    serde_json::to_string_pretty(&data).map_err(to_vn)
}

pub fn from_json_str(s: &str) -> VnResult<LabelFile> {
    let data: LabelFileData =
        serde_json::from_str(s).map_err(to_vn_kind(ErrorKind::InvalidFormat))?;
    for shape in &data.shapes {
        shape.validate()?;
    }
    let image_data = data
        .image_data
        .map(|d| STANDARD.decode(d))
        .transpose()
        .map_err(to_vn_kind(ErrorKind::InvalidFormat))?;
    let colors = match (data.line_color, data.fill_color) {
        (None, None) => None,
        (line_color, fill_color) => {
            let default = DocColors::default();
            Some(DocColors {
                line_color: line_color.unwrap_or(default.line_color),
                fill_color: fill_color.unwrap_or(default.fill_color),
            })
        }
    };
    Ok(LabelFile {
        record: AnnotationRecord {
            image_path: data.image_path,
            image_shape: data.image_shape,
            shapes: data.shapes,
            verified: data.verified,
        },
        image_data,
        colors,
    })
}

#[test]
fn test_label_file_roundtrip() {
    use crate::domain::PtF;
    let mut shape = Shape::new_box("tree", PtF::new(0.1, 0.2), PtF::new(7.7, 8.8));
    shape.difficult = true;
    let record = AnnotationRecord {
        image_path: "/x/y/z.png".to_string(),
        image_shape: ImageShape::new(8, 9, 1),
        shapes: vec![shape],
        verified: false,
    };
    let colors = DocColors {
        line_color: Rgba::new(1, 2, 3, 4),
        fill_color: Rgba::new(5, 6, 7, 8),
    };
    let s = to_json_string(&record, Some(&[1, 2, 3, 255]), colors).unwrap();
    let read = from_json_str(&s).unwrap();
    assert!(read.record.is_close_to(&record));
    assert_eq!(read.image_data, Some(vec![1, 2, 3, 255]));
    assert_eq!(read.colors, Some(colors));

    let s = to_json_string(&record, None, DocColors::default()).unwrap();
    assert!(!s.contains("image_data"));
    assert_eq!(from_json_str(&s).unwrap().image_data, None);
}

#[test]
fn test_label_file_without_colors() {
    let s = r#"{"image_path": "a.png", "image_shape": {"w": 1, "h": 1, "depth": 3},
        "verified": false, "shapes": []}"#;
    assert_eq!(from_json_str(s).unwrap().colors, None);
    let s = r#"{"image_path": "a.png", "image_shape": {"w": 1, "h": 1, "depth": 3},
        "verified": false, "fill_color": [9, 9, 9, 9], "shapes": []}"#;
    let colors = from_json_str(s).unwrap().colors.unwrap();
    assert_eq!(colors.fill_color, Rgba::new(9, 9, 9, 9));
    assert_eq!(colors.line_color, DocColors::default().line_color);
}

#[test]
fn test_label_file_invalid() {
    let e = from_json_str("{\"image_path\": 1}").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidFormat);
    let s = r#"{"image_path": "a.png", "image_shape": {"w": 1, "h": 1, "depth": 3},
        "verified": true,
        "shapes": [{"label": "x", "points": [], "line_color": [0,0,0,0],
                    "fill_color": [0,0,0,0], "difficult": false}]}"#;
    let e = from_json_str(s).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidFormat);
}
