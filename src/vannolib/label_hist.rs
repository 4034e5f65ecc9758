use std::{fmt::Debug, path::Path};
use tracing::info;

use crate::{file_util, result::VnResult};

/// Labels offered for new shapes. Starts with the predefined classes and grows by every label
/// the user types that is not known yet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelHist {
    labels: Vec<String>,
    last_label: Option<String>,
    single_class: bool,
}

impl LabelHist {
    pub fn new(single_class: bool) -> Self {
        LabelHist {
            single_class,
            ..Default::default()
        }
    }

    /// Reads one class per line. A missing file yields an empty history.
    pub fn from_predefined_classes<P>(path: P, single_class: bool) -> VnResult<Self>
    where
        P: AsRef<Path> + Debug,
    {
        let mut hist = Self::new(single_class);
        if let Some(content) = file_util::read_to_string_if_exists(&path)? {
            for label in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
                hist.add(label);
            }
            info!("loaded {} predefined classes from {path:?}", hist.labels.len());
        }
        Ok(hist)
    }

    fn add(&mut self, label: &str) -> bool {
        if self.labels.iter().any(|l| l == label) {
            false
        } else {
            self.labels.push(label.to_string());
            true
        }
    }

    /// Remembers the label of a newly created shape. Returns `true` if the label was unseen.
    pub fn record(&mut self, label: &str) -> bool {
        self.last_label = Some(label.to_string());
        self.add(label)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
    pub fn last_label(&self) -> Option<&str> {
        self.last_label.as_deref()
    }
    pub fn single_class(&self) -> bool {
        self.single_class
    }
    pub fn set_single_class(&mut self, single_class: bool) {
        self.single_class = single_class;
    }

    /// In single class mode every new shape gets the last label without asking.
    pub fn label_for_new_shape(&self) -> Option<&str> {
        if self.single_class {
            self.last_label()
        } else {
            None
        }
    }
}

#[test]
fn test_label_hist() {
    use crate::{defer_folder_removal, file_util::DEFAULT_TMPDIR};
    let folder = DEFAULT_TMPDIR.join(format!("hist_{}", uuid::Uuid::new_v4()));
    defer_folder_removal!(&folder);
    let path = folder.join("predefined_classes.txt");
    let hist = LabelHist::from_predefined_classes(&path, false).unwrap();
    assert!(hist.labels().is_empty());

    file_util::write_atomic(&path, "dog\ncat\n\ndog\n").unwrap();
    let mut hist = LabelHist::from_predefined_classes(&path, false).unwrap();
    assert_eq!(hist.labels(), ["dog", "cat"]);
    assert!(!hist.record("cat"));
    assert!(hist.record("bird"));
    assert_eq!(hist.labels(), ["dog", "cat", "bird"]);
    assert_eq!(hist.label_for_new_shape(), None);
    hist.set_single_class(true);
    assert_eq!(hist.label_for_new_shape(), Some("bird"));
}
