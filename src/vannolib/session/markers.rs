use std::{fmt::Debug, path::Path};
use tracing::info;

use crate::{file_util, result::VnResult};

/// First and last frame of the relevant part of a folder, persisted as two lines with an empty
/// line for an unset marker.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FolderMarkers {
    pub start: Option<String>,
    pub end: Option<String>,
}

fn toggle(marker: &mut Option<String>, file_name: &str) {
    if marker.as_deref() == Some(file_name) {
        *marker = None;
    } else {
        *marker = Some(file_name.to_string());
    }
}

fn non_empty(line: Option<&str>) -> Option<String> {
    line.map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
}

impl FolderMarkers {
    pub fn load<P>(path: P) -> VnResult<Self>
    where
        P: AsRef<Path> + Debug,
    {
        Ok(match file_util::read_to_string_if_exists(&path)? {
            Some(content) => {
                let mut lines = content.lines();
                FolderMarkers {
                    start: non_empty(lines.next()),
                    end: non_empty(lines.next()),
                }
            }
            None => FolderMarkers::default(),
        })
    }

    /// Sets the start marker to `file_name` or clears it if it already marks `file_name`.
    pub fn toggle_start(&mut self, file_name: &str) {
        toggle(&mut self.start, file_name);
    }

    pub fn toggle_end(&mut self, file_name: &str) {
        toggle(&mut self.end, file_name);
    }

    pub fn save<P>(&self, path: P) -> VnResult<()>
    where
        P: AsRef<Path> + Debug,
    {
        let content = format!(
            "{}\n{}\n",
            self.start.as_deref().unwrap_or(""),
            self.end.as_deref().unwrap_or("")
        );
        file_util::write_atomic(&path, content)?;
        info!("saved markers {self:?} to {path:?}");
        Ok(())
    }
}

#[test]
fn test_markers() {
    use crate::{defer_folder_removal, file_util::DEFAULT_TMPDIR};
    let folder = DEFAULT_TMPDIR.join(format!("markers_{}", uuid::Uuid::new_v4()));
    defer_folder_removal!(&folder);
    let path = folder.join("7").join("start_end.txt");
    let mut markers = FolderMarkers::load(&path).unwrap();
    assert_eq!(markers, FolderMarkers::default());
    markers.toggle_start("a.png");
    markers.toggle_end("z.png");
    markers.save(&path).unwrap();
    assert_eq!(FolderMarkers::load(&path).unwrap(), markers);
    markers.toggle_start("b.png");
    assert_eq!(markers.start.as_deref(), Some("b.png"));
    markers.toggle_start("b.png");
    assert_eq!(markers.start, None);
    markers.save(&path).unwrap();
    let loaded = FolderMarkers::load(&path).unwrap();
    assert_eq!(loaded.start, None);
    assert_eq!(loaded.end.as_deref(), Some("z.png"));
}
