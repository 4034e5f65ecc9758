pub mod annotations;
pub mod cfg;
pub mod control;
pub mod domain;
pub mod file_util;
pub mod image_scan;
pub mod label_hist;
pub mod result;
pub mod session;
pub mod test_helpers;
pub mod tracing_setup;
pub mod util;
pub use annotations::{AnnotationFormat, AnnotationRecord};
pub use control::{AbortReason, Control, Nav, Prompt};
pub use result::{VnError, VnResult};
