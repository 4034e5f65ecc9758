mod bb;
mod core;
mod shape;

pub use bb::BbF;
pub use self::core::{
    color_from_label, floats_close, DocColors, ImageShape, PtF, Rgba, TPtF, DEFAULT_FILL_COLOR,
    DEFAULT_LINE_COLOR,
};
pub use shape::Shape;
