use std::{fs, path::Path};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::{
    file_util,
    result::{io_to_vn, to_vn, ErrorKind, VnResult},
    vnerr,
};

pub const SUPPORTED_EXTENSIONS: [&str; 4] = [".jpeg", ".jpg", ".png", ".bmp"];

pub fn is_supported_image<P: AsRef<Path>>(p: P) -> bool {
    p.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|sup_ext| sup_ext[1..].eq_ignore_ascii_case(ext))
        })
        == Some(true)
}

/// All supported images below `folder`, recursively, as absolute paths. The order is the
/// case-insensitive lexicographic order of the full paths, hence `img10.png` comes before
/// `img2.png`.
pub fn scan_images<P: AsRef<Path>>(folder: P) -> VnResult<Vec<String>> {
    let folder = folder.as_ref();
    if !folder.is_dir() {
        return Err(vnerr!(ErrorKind::NotFound; "{:?} is not a folder", folder));
    }
    let folder = file_util::absolute(folder)?;
    let mut paths = WalkDir::new(&folder)
        .into_iter()
        .filter(|p| match p {
            Err(_) => true,
            Ok(p_) => p_.file_type().is_file() && is_supported_image(p_.path()),
        })
        .map(|p| Ok(file_util::path_to_str(p.map_err(to_vn)?.path())?.to_string()))
        .collect::<VnResult<Vec<String>>>()?;
    paths.sort_by_cached_key(|p| p.to_lowercase());
    info!("found {} images in {folder:?}", paths.len());
    Ok(paths)
}

/// Immediate sub folders of `folder` whose names are integers, sorted numerically.
pub fn scan_dirs<P: AsRef<Path>>(folder: P) -> VnResult<Vec<String>> {
    let folder = folder.as_ref();
    let mut ids = fs::read_dir(folder)
        .map_err(|e| io_to_vn(folder, e))?
        .flatten()
        .filter(|de| de.path().is_dir())
        .filter_map(|de| {
            let name = de.file_name().to_string_lossy().to_string();
            match name.parse::<u64>() {
                Ok(id) => Some((id, name)),
                Err(_) => {
                    warn!("skipping non-numeric folder {name}");
                    None
                }
            }
        })
        .collect::<Vec<_>>();
    ids.sort();
    Ok(ids.into_iter().map(|(_, name)| name).collect())
}

#[cfg(test)]
use crate::{defer_folder_removal, file_util::DEFAULT_TMPDIR};

#[test]
fn test_sort_and_filter() {
    let folder = DEFAULT_TMPDIR.join(format!("scan_{}", uuid::Uuid::new_v4()));
    defer_folder_removal!(&folder);
    let sub = folder.join("Sub");
    fs::create_dir_all(&sub).unwrap();
    for f in ["img2.png", "img10.png", "b.txt", "c.JPG", "a.png"] {
        fs::write(folder.join(f), []).unwrap();
    }
    fs::write(sub.join("d.bmp"), []).unwrap();
    fs::write(sub.join("e.jpeg.bak"), []).unwrap();
    let paths = scan_images(&folder).unwrap();
    let names = paths
        .iter()
        .map(|p| {
            Path::new(p)
                .strip_prefix(&folder)
                .unwrap()
                .to_str()
                .unwrap()
                .replace('\\', "/")
        })
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec!["a.png", "c.JPG", "img10.png", "img2.png", "Sub/d.bmp"]
    );
    assert!(paths.iter().all(|p| Path::new(p).is_absolute()));
}

#[test]
fn test_empty_and_missing() {
    let folder = DEFAULT_TMPDIR.join(format!("scan_{}", uuid::Uuid::new_v4()));
    defer_folder_removal!(&folder);
    fs::create_dir_all(&folder).unwrap();
    assert!(scan_images(&folder).unwrap().is_empty());
    let e = scan_images(folder.join("missing")).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::NotFound);
}

#[test]
fn test_scan_dirs() {
    let folder = DEFAULT_TMPDIR.join(format!("scan_{}", uuid::Uuid::new_v4()));
    defer_folder_removal!(&folder);
    for d in ["10", "9", "100", "x"] {
        fs::create_dir_all(folder.join(d)).unwrap();
    }
    fs::write(folder.join("11"), []).unwrap();
    assert_eq!(scan_dirs(&folder).unwrap(), vec!["9", "10", "100"]);
}
