use crate::{
    result::{io_to_vn, to_vn, VnResult},
    vnerr,
};
use lazy_static::lazy_static;
use std::{
    ffi::OsStr,
    fmt::Debug,
    fs,
    io,
    path::{Path, PathBuf},
};
use tracing::{error, info};

lazy_static! {
    pub static ref DEFAULT_TMPDIR: PathBuf = std::env::temp_dir().join("vanno");
}
lazy_static! {
    pub static ref DEFAULT_HOMEDIR: PathBuf = match dirs::home_dir() {
        Some(p) => p.join(".vanno"),
        _ => std::env::temp_dir().join("vanno"),
    };
}

pub fn read_to_string<P>(p: P) -> VnResult<String>
where
    P: AsRef<Path> + Debug,
{
    fs::read_to_string(&p).map_err(|e| io_to_vn(&p, e))
}

/// Like [`read_to_string`](read_to_string) but a missing file is `Ok(None)`.
pub fn read_to_string_if_exists<P>(p: P) -> VnResult<Option<String>>
where
    P: AsRef<Path> + Debug,
{
    match read_to_string(&p) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn path_to_str(p: &Path) -> VnResult<&str> {
    osstr_to_str(Some(p.as_os_str()))
        .map_err(|e| vnerr!("could not transform '{:?}' due to '{:?}'", p, e))
}

pub fn osstr_to_str(p: Option<&OsStr>) -> io::Result<&str> {
    p.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{p:?} not found")))?
        .to_str()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{p:?} not convertible to unicode"),
            )
        })
}

pub fn to_stem_str(p: &Path) -> VnResult<&str> {
    osstr_to_str(p.file_stem())
        .map_err(|e| vnerr!("could not transform '{:?}' due to '{:?}'", p, e))
}

pub fn to_name_str(p: &Path) -> VnResult<&str> {
    osstr_to_str(p.file_name())
        .map_err(|e| vnerr!("could not transform '{:?}' due to '{:?}'", p, e))
}

/// Name of the folder that directly contains `p`, i.e., `b` for `a/b/c.png`.
pub fn parent_folder_name(p: &Path) -> VnResult<&str> {
    let parent = p
        .parent()
        .ok_or_else(|| vnerr!("{:?} has no parent folder", p))?;
    to_name_str(parent)
}

/// Replaces the extension of `file_path` by `new_ext` (including the dot) and puts the result
/// into `folder` if given, next to `file_path` otherwise.
pub fn with_extension_in<P>(file_path: P, folder: Option<&Path>, new_ext: &str) -> VnResult<PathBuf>
where
    P: AsRef<Path>,
{
    let file_path = file_path.as_ref();
    let file_name = format!("{}{new_ext}", to_stem_str(file_path)?);
    Ok(match folder {
        Some(folder) => folder.join(file_name),
        None => file_path.with_file_name(file_name),
    })
}

pub fn create_dir_all<P>(path: P) -> VnResult<()>
where
    P: AsRef<Path> + Debug,
{
    fs::create_dir_all(&path).map_err(|e| io_to_vn(&path, e))
}

pub fn write<P, C>(path: P, contents: C) -> VnResult<()>
where
    P: AsRef<Path> + Debug,
    C: AsRef<[u8]>,
{
    fs::write(&path, contents).map_err(|e| io_to_vn(&path, e))
}

/// Writes to a sibling temp file and renames it onto `path`. Either the old or the new content
/// is on disk afterwards, never a truncated mix. The parent folder is created if necessary.
pub fn write_atomic<P, C>(path: P, contents: C) -> VnResult<()>
where
    P: AsRef<Path> + Debug,
    C: AsRef<[u8]>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }
    let tmp_name = format!(".{}.{}.tmp", to_name_str(path)?, uuid::Uuid::new_v4());
    let tmp_path = path.with_file_name(tmp_name);
    write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path).map_err(|e| {
        checked_remove(&tmp_path, fs::remove_file);
        io_to_vn(path, e)
    })
}

pub fn append_line<P>(path: P, line: &str) -> VnResult<()>
where
    P: AsRef<Path> + Debug,
{
    use std::io::Write;
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }
    let mut f = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| io_to_vn(path, e))?;
    writeln!(f, "{line}").map_err(|e| io_to_vn(path, e))
}

/// Absolute version of `p` without resolving symlinks.
pub fn absolute<P>(p: P) -> VnResult<PathBuf>
where
    P: AsRef<Path>,
{
    std::path::absolute(p.as_ref()).map_err(to_vn)
}

pub struct Defer<F: FnMut()> {
    pub func: F,
}
impl<F: FnMut()> Drop for Defer<F> {
    fn drop(&mut self) {
        (self.func)();
    }
}
#[macro_export]
macro_rules! defer {
    ($f:expr) => {
        let _dfr = $crate::file_util::Defer { func: $f };
    };
}
pub fn checked_remove<'a, P: AsRef<Path> + Debug + ?Sized>(
    path: &'a P,
    func: fn(p: &'a P) -> io::Result<()>,
) {
    match func(path) {
        Ok(_) => info!("removed {path:?}"),
        Err(e) => error!("could not remove {path:?} due to {e:?}"),
    }
}
#[macro_export]
macro_rules! defer_folder_removal {
    ($path:expr) => {
        let func = || $crate::file_util::checked_remove($path, std::fs::remove_dir_all);
        $crate::defer!(func);
    };
}

#[test]
fn test_with_extension_in() {
    let p = with_extension_in("/data/imgs/a.b.png", None, ".xml").unwrap();
    assert_eq!(p, PathBuf::from("/data/imgs/a.b.xml"));
    let p = with_extension_in("/data/imgs/img1.JPG", Some(Path::new("/out/3")), ".xml").unwrap();
    assert_eq!(p, PathBuf::from("/out/3/img1.xml"));
}

#[test]
fn test_parent_folder_name() {
    assert_eq!(
        parent_folder_name(Path::new("/a/1034/img.png")).unwrap(),
        "1034"
    );
}

#[test]
fn test_write_atomic_and_append() {
    let folder = DEFAULT_TMPDIR.join(format!("fu_{}", uuid::Uuid::new_v4()));
    defer_folder_removal!(&folder);
    let p = folder.join("sub").join("x.txt");
    write_atomic(&p, "first").unwrap();
    write_atomic(&p, "second").unwrap();
    assert_eq!(read_to_string(&p).unwrap(), "second");
    let n_entries = fs::read_dir(folder.join("sub")).unwrap().count();
    assert_eq!(n_entries, 1);
    let log = folder.join("log.txt");
    append_line(&log, "a").unwrap();
    append_line(&log, "b").unwrap();
    assert_eq!(read_to_string(&log).unwrap(), "a\nb\n");
    assert_eq!(read_to_string_if_exists(folder.join("nope")).unwrap(), None);
}
