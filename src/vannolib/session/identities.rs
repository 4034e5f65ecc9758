use lazy_static::lazy_static;
use regex::Regex;
use std::{fmt::Debug, path::Path};
use tracing::{info, warn};

use crate::{file_util, result::VnResult};

lazy_static! {
    static ref IDENTITY_RE: Regex =
        Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("identity regex broken");
}

/// Identities end up in file names, hence only letters, digits, `_`, `.`, and `-` are allowed.
pub fn is_valid_identity(identity: &str) -> bool {
    IDENTITY_RE.is_match(identity)
}

/// One identity per line. A missing file means there are no identities. Invalid and duplicate
/// entries are skipped.
pub fn load_identities<P>(path: P) -> VnResult<Vec<String>>
where
    P: AsRef<Path> + Debug,
{
    let content = match file_util::read_to_string_if_exists(&path)? {
        Some(c) => c,
        None => {
            warn!("no identities file at {path:?}");
            return Ok(vec![]);
        }
    };
    let mut ids: Vec<String> = vec![];
    for id in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !is_valid_identity(id) {
            warn!("skipping invalid identity '{id}'");
        } else if !ids.iter().any(|known| known == id) {
            ids.push(id.to_string());
        }
    }
    info!("loaded {} identities from {path:?}", ids.len());
    Ok(ids)
}

#[test]
fn test_identities() {
    use crate::{defer_folder_removal, file_util::DEFAULT_TMPDIR};
    assert!(is_valid_identity("anna.b-c_1"));
    assert!(!is_valid_identity("anna b"));
    assert!(!is_valid_identity("../anna"));
    assert!(!is_valid_identity(""));

    let folder = DEFAULT_TMPDIR.join(format!("ids_{}", uuid::Uuid::new_v4()));
    defer_folder_removal!(&folder);
    let path = folder.join("ids.txt");
    assert!(load_identities(&path).unwrap().is_empty());
    file_util::write_atomic(&path, "anna\n\n ben \nc/d\nanna\n").unwrap();
    assert_eq!(load_identities(&path).unwrap(), vec!["anna", "ben"]);
}
