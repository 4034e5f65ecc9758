use std::{fmt::Debug, path::Path};
use tracing::{info, warn};

use super::{
    is_valid_identity, session_label, stats_log, EnvPaths, JobAssignment, KvStore, StatLine,
};
use crate::{
    file_util,
    result::{to_vn_kind, ErrorKind, VnResult},
    util, vnerr,
};

/// Folders are identified by the integer value of their name.
pub type FolderId = u64;

fn parse_folder_id(folder_name: &str) -> VnResult<FolderId> {
    folder_name
        .trim()
        .parse::<FolderId>()
        .map_err(to_vn_kind(ErrorKind::InvalidFormat))
}

pub fn kv_key(session: usize) -> String {
    format!("checklist/{session:02}")
}

/// Reads the done folders of a checklist file, one id per line. A missing file means nothing is
/// done yet. Unparsable lines and ids that are not part of `folder_ids` are skipped.
pub fn load_done<P>(path: P, folder_ids: &[FolderId]) -> VnResult<Vec<FolderId>>
where
    P: AsRef<Path> + Debug,
{
    let content = file_util::read_to_string_if_exists(&path)?.unwrap_or_default();
    let mut done = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|l| match parse_folder_id(l) {
            Ok(id) if folder_ids.contains(&id) => Some(id),
            Ok(id) => {
                warn!("folder {id} in {path:?} is not part of the session");
                None
            }
            Err(e) => {
                warn!("skipping line '{l}' of {path:?} due to {e}");
                None
            }
        })
        .collect::<Vec<_>>();
    done.sort_unstable();
    done.dedup();
    Ok(done)
}

/// Review progress of one session of one identity, i.e., the set of folders marked as done.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checklist {
    identity: String,
    session: usize,
    folders: Vec<String>,
    folder_ids: Vec<FolderId>,
    done: Vec<FolderId>,
    dirty: bool,
}

impl Checklist {
    /// Checklist with nothing done.
    pub fn new(identity: &str, session: usize, folders: &[String]) -> VnResult<Self> {
        let folder_ids = folders
            .iter()
            .map(|f| parse_folder_id(f))
            .collect::<VnResult<Vec<_>>>()?;
        Ok(Checklist {
            identity: identity.to_string(),
            session,
            folders: folders.to_vec(),
            folder_ids,
            done: vec![],
            dirty: false,
        })
    }

    /// Validates the identity and the session number against the job assignment before anything
    /// is read.
    pub fn open(
        env: &EnvPaths,
        jobs: &JobAssignment,
        identity: &str,
        session: usize,
    ) -> VnResult<Self> {
        if !is_valid_identity(identity) {
            return Err(vnerr!(ErrorKind::InvalidFormat; "invalid identity '{}'", identity));
        }
        let folders = jobs.folders_for(identity, session)?;
        let mut checklist = Self::new(identity, session, folders)?;
        checklist.done = load_done(env.checklist(identity, session), &checklist.folder_ids)?;
        info!(
            "opened checklist {} with {}/{} done",
            session_label(identity, session),
            checklist.n_done(),
            checklist.n_total()
        );
        Ok(checklist)
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }
    pub fn session(&self) -> usize {
        self.session
    }
    pub fn folders(&self) -> &[String] {
        &self.folders
    }
    pub fn folder_ids(&self) -> &[FolderId] {
        &self.folder_ids
    }
    /// Sorted ascending.
    pub fn done(&self) -> &[FolderId] {
        &self.done
    }
    pub fn n_done(&self) -> usize {
        self.done.len()
    }
    pub fn n_total(&self) -> usize {
        self.folders.len()
    }
    pub fn is_done(&self, folder_id: FolderId) -> bool {
        self.done.binary_search(&folder_id).is_ok()
    }
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Flips the done state of a folder of this session and returns the new state.
    pub fn toggle(&mut self, folder_id: FolderId) -> VnResult<bool> {
        if !self.folder_ids.contains(&folder_id) {
            return Err(vnerr!(
                ErrorKind::OutOfRange;
                "folder {} is not part of session {}",
                folder_id,
                session_label(&self.identity, self.session)
            ));
        }
        self.dirty = true;
        match self.done.binary_search(&folder_id) {
            Ok(idx) => {
                self.done.remove(idx);
                Ok(false)
            }
            Err(idx) => {
                self.done.insert(idx, folder_id);
                Ok(true)
            }
        }
    }

    pub fn toggle_folder(&mut self, folder_name: &str) -> VnResult<bool> {
        self.toggle(parse_folder_id(folder_name)?)
    }

    pub fn persist(&mut self, env: &EnvPaths, kv: Option<&mut KvStore>) -> VnResult<StatLine> {
        self.persist_at(env, kv, util::now())
    }

    /// Overwrites the checklist file, mirrors the done set into the identity's key-value store,
    /// and appends a line to the statistics log. The checklist stays dirty if any step fails.
    pub fn persist_at(
        &mut self,
        env: &EnvPaths,
        kv: Option<&mut KvStore>,
        timestamp: chrono::NaiveDateTime,
    ) -> VnResult<StatLine> {
        let content = self
            .done
            .iter()
            .map(|id| format!("{id}\n"))
            .collect::<String>();
        file_util::write_atomic(env.checklist(&self.identity, self.session), content)?;
        if let Some(kv) = kv {
            kv.put(&kv_key(self.session), &self.done)?;
        }
        let line = StatLine {
            identity: self.identity.clone(),
            session: self.session,
            timestamp,
            n_done: self.n_done(),
            n_total: self.n_total(),
        };
        stats_log::append(env.statistics(), &line)?;
        self.dirty = false;
        info!("persisted checklist {line}");
        Ok(line)
    }
}

#[cfg(test)]
use crate::{defer_folder_removal, file_util::DEFAULT_TMPDIR};

#[cfg(test)]
fn make_env() -> (EnvPaths, std::path::PathBuf) {
    let folder = DEFAULT_TMPDIR.join(format!("checklist_{}", uuid::Uuid::new_v4()));
    (
        EnvPaths::new(folder.join("env"), folder.join("res"), folder.join("ids.txt")),
        folder,
    )
}

#[test]
fn test_toggle() {
    let folders = ["5", "2", "9"].map(String::from);
    let mut cl = Checklist::new("anna", 1, &folders).unwrap();
    assert!(!cl.is_dirty());
    assert!(cl.toggle(9).unwrap());
    assert!(cl.toggle(2).unwrap());
    assert_eq!(cl.done(), [2, 9]);
    assert!(!cl.toggle(9).unwrap());
    assert!(cl.toggle_folder("5").unwrap());
    assert_eq!(cl.done(), [2, 5]);
    assert!(cl.is_dirty());
    assert_eq!(cl.toggle(3).unwrap_err().kind(), ErrorKind::OutOfRange);
    assert_eq!(cl.n_total(), 3);
    assert!(Checklist::new("anna", 1, &["abc".to_string()]).is_err());
}

#[test]
fn test_persist_and_reopen() {
    let (env, folder) = make_env();
    defer_folder_removal!(&folder);
    let jobs = JobAssignment::from_json_str(r#"{"anna": [["1","2","3","4","5"], ["6"]]}"#).unwrap();
    let mut kv = KvStore::open(&env, "anna").unwrap();
    let mut cl = Checklist::open(&env, &jobs, "anna", 1).unwrap();
    assert_eq!(cl.n_done(), 0);
    for id in [4, 1, 2] {
        cl.toggle(id).unwrap();
    }
    let ts = chrono::NaiveDateTime::parse_from_str(
        "2024-03-01 17:04:11.532113",
        util::TIMESTAMP_FORMAT,
    )
    .unwrap();
    let line = cl.persist_at(&env, Some(&mut kv), ts).unwrap();
    assert!(!cl.is_dirty());
    assert_eq!(line.to_string(), "anna_01, 2024-03-01 17:04:11.532113 - 3/5");
    assert_eq!(
        file_util::read_to_string(env.checklist("anna", 1)).unwrap(),
        "1\n2\n4\n"
    );
    assert_eq!(
        file_util::read_to_string(env.statistics()).unwrap(),
        "anna_01, 2024-03-01 17:04:11.532113 - 3/5\n"
    );
    assert_eq!(
        kv.get::<Vec<FolderId>>(&kv_key(1)).unwrap(),
        Some(vec![1, 2, 4])
    );

    let reopened = Checklist::open(&env, &jobs, "anna", 1).unwrap();
    assert_eq!(reopened.done(), [1, 2, 4]);
    assert!(!reopened.is_dirty());
    let other = Checklist::open(&env, &jobs, "anna", 2).unwrap();
    assert_eq!(other.n_done(), 0);
}

#[test]
fn test_open_bounds_and_garbage() {
    let (env, folder) = make_env();
    defer_folder_removal!(&folder);
    let jobs = JobAssignment::from_json_str(r#"{"anna": [["1","2"]]}"#).unwrap();
    let e = Checklist::open(&env, &jobs, "anna", 2).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::OutOfRange);
    assert!(!env.checklist("anna", 2).exists());
    file_util::write_atomic(env.checklist("anna", 1), "2\nxyz\n77\n2\n").unwrap();
    let cl = Checklist::open(&env, &jobs, "anna", 1).unwrap();
    assert_eq!(cl.done(), [2]);
}

#[test]
fn test_open_rejects_path_like_identity() {
    let (env, folder) = make_env();
    defer_folder_removal!(&folder);
    let jobs = JobAssignment::from_json_str(r#"{"../anna": [["1"]], "anna": [["1"]]}"#).unwrap();
    file_util::write_atomic(env.checklist("../anna", 1), "1\n").unwrap();
    let e = Checklist::open(&env, &jobs, "../anna", 1).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidFormat);
    assert_eq!(Checklist::open(&env, &jobs, "anna", 1).unwrap().n_done(), 0);
}
