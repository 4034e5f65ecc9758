use serde::{Deserialize, Serialize};

use super::{
    bb::BbF,
    core::{color_from_label, PtF, Rgba},
};
use crate::{
    result::{ErrorKind, VnResult},
    vnerr,
};

/// A labeled polygon. Boxes are polygons with four corners.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Shape {
    pub label: String,
    pub points: Vec<PtF>,
    pub line_color: Rgba,
    pub fill_color: Rgba,
    pub difficult: bool,
}
impl Shape {
    /// Shape colored by its label as done for freshly drawn shapes. Surrounding whitespace of the
    /// label is dropped.
    pub fn new(label: &str, points: Vec<PtF>) -> Self {
        let label = label.trim();
        let color = color_from_label(label);
        Shape {
            label: label.to_string(),
            points,
            line_color: color,
            fill_color: color,
            difficult: false,
        }
    }
    pub fn new_box(label: &str, min: PtF, max: PtF) -> Self {
        let bb = BbF {
            x_min: min.x,
            y_min: min.y,
            x_max: max.x,
            y_max: max.y,
        };
        Self::new(label, bb.corners().to_vec())
    }
    pub fn bb(&self) -> VnResult<BbF> {
        BbF::from_points(&self.points)
    }
    /// A shape needs a trimmed, non-empty label and at least one vertex. Xml text loses
    /// surrounding whitespace, so such labels would not survive a Pascal VOC file.
    pub fn validate(&self) -> VnResult<()> {
        if self.points.is_empty() {
            Err(vnerr!(ErrorKind::InvalidFormat; "shape '{}' has no points", self.label))
        } else if self.label.trim().is_empty() {
            Err(vnerr!(ErrorKind::InvalidFormat; "shape without label"))
        } else if self.label.trim() != self.label {
            Err(vnerr!(
                ErrorKind::InvalidFormat;
                "label '{}' has surrounding whitespace",
                self.label
            ))
        } else {
            Ok(())
        }
    }
    /// Label change that also recolors the outline like a fresh shape with that label.
    pub fn relabel(&mut self, label: &str) -> bool {
        let label = label.trim();
        if self.label != label {
            self.label = label.to_string();
            self.line_color = color_from_label(label);
            true
        } else {
            false
        }
    }
}

#[test]
fn test_shape() {
    let mut s = Shape::new_box("dog", PtF::new(1.0, 2.0), PtF::new(3.0, 4.0));
    assert_eq!(s.points.len(), 4);
    assert!(s.validate().is_ok());
    assert_eq!(s.bb().unwrap().h(), 2.0);
    let fill = s.fill_color;
    assert!(!s.relabel("dog"));
    assert!(s.relabel("cat"));
    assert_eq!(s.line_color, color_from_label("cat"));
    assert_eq!(s.fill_color, fill);
    let empty = Shape::new("x", vec![]);
    assert_eq!(empty.validate().unwrap_err().kind(), ErrorKind::InvalidFormat);
}

#[test]
fn test_label_whitespace() {
    let mut s = Shape::new("  traffic  light ", vec![PtF::new(1.0, 1.0)]);
    assert_eq!(s.label, "traffic  light");
    assert_eq!(s.line_color, color_from_label("traffic  light"));
    assert!(s.validate().is_ok());
    assert!(!s.relabel(" traffic  light\n"));
    assert!(s.relabel("\tcar "));
    assert_eq!(s.label, "car");
    s.label = "  car  ".to_string();
    assert_eq!(s.validate().unwrap_err().kind(), ErrorKind::InvalidFormat);
    s.label = "   ".to_string();
    assert_eq!(s.validate().unwrap_err().kind(), ErrorKind::InvalidFormat);
}
