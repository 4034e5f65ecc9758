use serde::{Deserialize, Serialize};

use super::core::{PtF, TPtF};
use crate::{
    result::{ErrorKind, VnResult},
    vnerr,
};

/// Axis aligned box given by its corners.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct BbF {
    pub x_min: TPtF,
    pub y_min: TPtF,
    pub x_max: TPtF,
    pub y_max: TPtF,
}
impl BbF {
    pub fn from_points(points: &[PtF]) -> VnResult<Self> {
        let first = points
            .first()
            .ok_or_else(|| vnerr!(ErrorKind::InvalidFormat; "empty polygon has no bounding box"))?;
        Ok(points.iter().skip(1).fold(
            BbF {
                x_min: first.x,
                y_min: first.y,
                x_max: first.x,
                y_max: first.y,
            },
            |bb, p| BbF {
                x_min: bb.x_min.min(p.x),
                y_min: bb.y_min.min(p.y),
                x_max: bb.x_max.max(p.x),
                y_max: bb.y_max.max(p.y),
            },
        ))
    }
    /// Corners clockwise starting at the top left.
    pub fn corners(&self) -> [PtF; 4] {
        [
            PtF::new(self.x_min, self.y_min),
            PtF::new(self.x_max, self.y_min),
            PtF::new(self.x_max, self.y_max),
            PtF::new(self.x_min, self.y_max),
        ]
    }
    pub fn w(&self) -> TPtF {
        self.x_max - self.x_min
    }
    pub fn h(&self) -> TPtF {
        self.y_max - self.y_min
    }
}

#[test]
fn test_from_points() {
    let pts = [
        PtF::new(3.0, 4.5),
        PtF::new(1.0, 7.0),
        PtF::new(5.25, 2.0),
    ];
    let bb = BbF::from_points(&pts).unwrap();
    assert_eq!(
        bb,
        BbF {
            x_min: 1.0,
            y_min: 2.0,
            x_max: 5.25,
            y_max: 7.0
        }
    );
    assert_eq!(bb.corners()[2], PtF::new(5.25, 7.0));
    assert_eq!(bb.w(), 4.25);
    assert!(BbF::from_points(&[]).is_err());
}
