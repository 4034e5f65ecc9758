mod checklist;
mod identities;
mod jobs;
mod kv_store;
mod markers;
pub mod stats_log;

pub use checklist::{kv_key, load_done, Checklist, FolderId};
pub use identities::{is_valid_identity, load_identities};
pub use jobs::JobAssignment;
pub use kv_store::KvStore;
pub use markers::FolderMarkers;
pub use stats_log::StatLine;

use std::path::{Path, PathBuf};

/// `{identity}_{session}` with the session zero-padded to two digits, e.g., `anna_03`.
pub fn session_label(identity: &str, session: usize) -> String {
    format!("{identity}_{session:02}")
}

/// Locations of the files shared by all annotators of a dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvPaths {
    env_folder: PathBuf,
    results_dir: PathBuf,
    identities_file: PathBuf,
}
impl EnvPaths {
    pub fn new(env_folder: PathBuf, results_dir: PathBuf, identities_file: PathBuf) -> Self {
        EnvPaths {
            env_folder,
            results_dir,
            identities_file,
        }
    }
    pub fn env_folder(&self) -> &Path {
        &self.env_folder
    }
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }
    pub fn identities_file(&self) -> &Path {
        &self.identities_file
    }
    pub fn job_assign(&self) -> PathBuf {
        self.env_folder.join("job_assign.json")
    }
    pub fn statistics(&self) -> PathBuf {
        self.env_folder.join("Statistics.txt")
    }
    pub fn checklist(&self, identity: &str, session: usize) -> PathBuf {
        self.env_folder
            .join(format!("{}.txt", session_label(identity, session)))
    }
    pub fn kv_namespace(&self, identity: &str) -> PathBuf {
        self.env_folder.join(identity)
    }
    pub fn markers(&self, folder_name: &str) -> PathBuf {
        self.results_dir.join(folder_name).join("start_end.txt")
    }
}

#[test]
fn test_env_paths() {
    let env = EnvPaths::new(
        PathBuf::from("/r/jester_env"),
        PathBuf::from("/r/jester"),
        PathBuf::from("/r/jester_env/ids.txt"),
    );
    assert_eq!(session_label("anna", 3), "anna_03");
    assert_eq!(session_label("anna", 123), "anna_123");
    assert_eq!(
        env.checklist("anna", 7),
        PathBuf::from("/r/jester_env/anna_07.txt")
    );
    assert_eq!(
        env.statistics(),
        PathBuf::from("/r/jester_env/Statistics.txt")
    );
    assert_eq!(
        env.markers("1034"),
        PathBuf::from("/r/jester/1034/start_end.txt")
    );
}
