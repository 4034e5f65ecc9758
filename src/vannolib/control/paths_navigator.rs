use std::path::Path;

use crate::{file_util, image_scan, result::VnResult};

fn next(file_selected_idx: usize, files_len: usize) -> Option<usize> {
    if file_selected_idx + 1 < files_len {
        Some(file_selected_idx + 1)
    } else {
        None
    }
}

fn prev(file_selected_idx: usize, files_len: usize) -> Option<usize> {
    if file_selected_idx > 0 && file_selected_idx <= files_len {
        Some(file_selected_idx - 1)
    } else {
        None
    }
}

/// Scanned images of the opened folder. Moving past either end yields `None`, there is no
/// wrap-around.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathsNavigator {
    folder_label: Option<String>,
    paths: Vec<String>,
}

impl PathsNavigator {
    pub fn new(folder_label: Option<String>, paths: Vec<String>) -> Self {
        Self {
            folder_label,
            paths,
        }
    }

    pub fn from_dir<P: AsRef<Path>>(folder: P) -> VnResult<Self> {
        let folder = folder.as_ref();
        let paths = image_scan::scan_images(folder)?;
        let folder_label = file_util::path_to_str(folder)?.to_string();
        Ok(Self::new(Some(folder_label), paths))
    }

    pub fn folder_label(&self) -> Option<&str> {
        self.folder_label.as_deref()
    }
    pub fn paths(&self) -> &[String] {
        &self.paths
    }
    pub fn len(&self) -> usize {
        self.paths.len()
    }
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
    pub fn file_path(&self, file_idx: usize) -> Option<&str> {
        self.paths.get(file_idx).map(|p| p.as_str())
    }
    pub fn idx_of(&self, path: &str) -> Option<usize> {
        self.paths.iter().position(|p| p == path)
    }

    /// Index after the current path. Without current path this is the first image.
    pub fn next_idx(&self, current: Option<&str>) -> Option<usize> {
        match current {
            Some(cur) => self.idx_of(cur).and_then(|idx| next(idx, self.len())),
            None if !self.is_empty() => Some(0),
            None => None,
        }
    }

    /// Index before the current path. Without current path there is nothing before.
    pub fn prev_idx(&self, current: Option<&str>) -> Option<usize> {
        current
            .and_then(|cur| self.idx_of(cur))
            .and_then(|idx| prev(idx, self.len()))
    }
}

#[test]
fn test_prev_next() {
    assert_eq!(next(3, 4), None);
    assert_eq!(next(2, 4), Some(3));
    assert_eq!(next(5, 4), None);
    assert_eq!(next(0, 0), None);
    assert_eq!(prev(3, 4), Some(2));
    assert_eq!(prev(0, 3), None);
    assert_eq!(prev(9, 3), None);
}

#[test]
fn test_navigator() {
    let nav = PathsNavigator::new(None, ["a", "b", "c"].map(String::from).to_vec());
    assert_eq!(nav.next_idx(None), Some(0));
    assert_eq!(nav.prev_idx(None), None);
    assert_eq!(nav.next_idx(Some("a")), Some(1));
    assert_eq!(nav.next_idx(Some("c")), None);
    assert_eq!(nav.prev_idx(Some("a")), None);
    assert_eq!(nav.prev_idx(Some("c")), Some(1));
    assert_eq!(nav.next_idx(Some("unknown")), None);
    assert_eq!(PathsNavigator::default().next_idx(None), None);
}
