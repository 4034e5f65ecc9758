use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

pub type TPtF = f64;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct PtF {
    pub x: TPtF,
    pub y: TPtF,
}
impl PtF {
    pub fn new(x: TPtF, y: TPtF) -> Self {
        PtF { x, y }
    }
    pub fn is_close_to(&self, other: PtF) -> bool {
        floats_close(self.x, other.x) && floats_close(self.y, other.y)
    }
}
impl From<(TPtF, TPtF)> for PtF {
    fn from(xy: (TPtF, TPtF)) -> Self {
        PtF { x: xy.0, y: xy.1 }
    }
}

/// Closeness with single precision fidelity, which is what the persisted formats guarantee.
pub fn floats_close(x: TPtF, y: TPtF) -> bool {
    (x - y).abs() <= f32::EPSILON as f64 * x.abs().max(y.abs()).max(1.0)
}

/// Color as `[r, g, b, a]`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Rgba(pub [u8; 4]);
impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Rgba([r, g, b, a])
    }
    pub fn r(&self) -> u8 {
        self.0[0]
    }
    pub fn g(&self) -> u8 {
        self.0[1]
    }
    pub fn b(&self) -> u8 {
        self.0[2]
    }
    pub fn a(&self) -> u8 {
        self.0[3]
    }
}
impl Display for Rgba {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "({r}, {g}, {b}, {a})")
    }
}

pub const DEFAULT_LINE_COLOR: Rgba = Rgba::new(0, 255, 0, 128);
pub const DEFAULT_FILL_COLOR: Rgba = Rgba::new(255, 0, 0, 128);

/// Colors freshly drawn shapes start with. Label files carry them next to the shapes.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DocColors {
    pub line_color: Rgba,
    pub fill_color: Rgba,
}
impl Default for DocColors {
    fn default() -> Self {
        DocColors {
            line_color: DEFAULT_LINE_COLOR,
            fill_color: DEFAULT_FILL_COLOR,
        }
    }
}
const LABEL_COLOR_ALPHA: u8 = 100;

/// 64 bit FNV-1a. Colors derived from it must not change between builds, which the std hasher
/// does not guarantee.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET_BASIS, |h, b| (h ^ u64::from(*b)).wrapping_mul(PRIME))
}

/// Deterministic color of a label such that equal labels are drawn equally, also across builds.
pub fn color_from_label(label: &str) -> Rgba {
    let hash = fnv1a(label.as_bytes());
    let channel = |shift: u32| ((hash >> shift) % 255) as u8;
    Rgba::new(channel(8), channel(24), channel(40), LABEL_COLOR_ALPHA)
}

/// Size of an image, `depth` is the number of channels.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ImageShape {
    pub w: u32,
    pub h: u32,
    pub depth: u8,
}
impl ImageShape {
    pub fn new(w: u32, h: u32, depth: u8) -> Self {
        Self { w, h, depth }
    }
}

#[test]
fn test_color_from_label() {
    let c1 = color_from_label("car");
    assert_eq!(c1, color_from_label("car"));
    assert_eq!(c1.a(), LABEL_COLOR_ALPHA);
    assert_ne!(c1, color_from_label("person"));
    assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
    assert_eq!(fnv1a(b"car"), 0xf5e3_0519_0ce4_9fc1);
    assert_eq!(c1, Rgba::new(136, 4, 222, LABEL_COLOR_ALPHA));
    assert_eq!(
        color_from_label("person"),
        Rgba::new(190, 82, 204, LABEL_COLOR_ALPHA)
    );
}

#[test]
fn test_floats_close() {
    assert!(floats_close(1.0, 1.0 + 1e-9));
    assert!(floats_close(1234.5, 1234.5001));
    assert!(!floats_close(1.0, 1.01));
}
