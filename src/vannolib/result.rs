use std::{
    error::Error,
    fmt::{self, Debug, Display, Formatter},
    io,
    path::Path,
};
use tracing::{error, warn};

/// Coarse classification of failures. Callers branch on the kind, the message is for humans.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Debug, Default)]
pub enum ErrorKind {
    /// An optional file is missing, e.g., a checklist or a prior annotation.
    NotFound,
    /// A file exists but could not be parsed.
    InvalidFormat,
    /// A session number or folder index outside of the valid range.
    OutOfRange,
    /// Creating, reading, or writing a file failed.
    Io,
    #[default]
    Other,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::InvalidFormat => "invalid format",
            ErrorKind::OutOfRange => "index out of range",
            ErrorKind::Io => "io failure",
            ErrorKind::Other => "error",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct VnError {
    kind: ErrorKind,
    msg: String,
}
impl VnError {
    pub fn new(msg: &str) -> VnError {
        VnError {
            kind: ErrorKind::Other,
            msg: msg.to_string(),
        }
    }
    pub fn with_kind(kind: ErrorKind, msg: &str) -> VnError {
        VnError {
            kind,
            msg: msg.to_string(),
        }
    }
    pub fn msg(&self) -> &str {
        &self.msg
    }
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}
impl Display for VnError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.msg)
    }
}
impl Error for VnError {}
impl From<&str> for VnError {
    fn from(value: &str) -> Self {
        VnError::new(value)
    }
}
/// Vanno's result type with [`VnError`](VnError) as error type.
pub type VnResult<U> = Result<U, VnError>;

pub fn trace_ok_err<T, E>(x: Result<T, E>) -> Option<T>
where
    E: Debug,
{
    match x {
        Ok(x) => Some(x),
        Err(e) => {
            error!("{e:?}");
            None
        }
    }
}
pub fn trace_ok_warn<T, E>(x: Result<T, E>) -> Option<T>
where
    E: Debug,
{
    match x {
        Ok(x) => Some(x),
        Err(e) => {
            warn!("{e:?}");
            None
        }
    }
}

/// Creates a [`VnError`](VnError) with a formatted message. An optional leading kind followed by
/// `;` sets the [`ErrorKind`](ErrorKind), otherwise it is [`ErrorKind::Other`](ErrorKind::Other).
/// ```rust
/// # use std::error::Error;
/// use vannolib::{vnerr, result::{ErrorKind, VnError}};
/// # fn main() -> Result<(), Box<dyn Error>> {
/// assert_eq!(vnerr!("some error {}", 1), VnError::new(format!("some error {}", 1).as_str()));
/// assert_eq!(vnerr!(ErrorKind::OutOfRange; "session {}", 0).kind(), ErrorKind::OutOfRange);
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! vnerr {
    ($s:literal) => {
        $crate::result::VnError::new(format!($s).as_str())
    };
    ($s:literal, $( $exps:expr ),*) => {
        $crate::result::VnError::new(format!($s, $($exps,)*).as_str())
    };
    ($kind:expr; $s:literal) => {
        $crate::result::VnError::with_kind($kind, format!($s).as_str())
    };
    ($kind:expr; $s:literal, $( $exps:expr ),*) => {
        $crate::result::VnError::with_kind($kind, format!($s, $($exps,)*).as_str())
    }
}

pub fn to_vn<E: Debug>(e: E) -> VnError {
    vnerr!(
        "original error type is '{:?}', error message is '{:?}'",
        std::any::type_name::<E>(),
        e
    )
}

pub fn to_vn_kind<E: Debug>(kind: ErrorKind) -> impl Fn(E) -> VnError {
    move |e| vnerr!(kind; "{:?}", e)
}

pub fn io_to_vn<P>(path: P, e: io::Error) -> VnError
where
    P: AsRef<Path>,
{
    let kind = match e.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        _ => ErrorKind::Io,
    };
    vnerr!(kind; "{:?} failed due to {:?}", path.as_ref(), e)
}

#[test]
fn test_io_kinds() {
    let e = io_to_vn("a/b", io::Error::new(io::ErrorKind::NotFound, "gone"));
    assert!(e.is_not_found());
    let e = io_to_vn("a/b", io::Error::new(io::ErrorKind::PermissionDenied, "nope"));
    assert_eq!(e.kind(), ErrorKind::Io);
    assert!(format!("{e}").starts_with("io failure"));
}
