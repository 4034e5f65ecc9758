use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt::Debug, path::Path};
use tracing::info;

use crate::{
    file_util,
    result::{to_vn_kind, ErrorKind, VnResult},
    vnerr,
};

/// Which annotator reviews which folders. Each identity has an ordered list of sessions, each
/// session is an ordered list of folder names. Session numbers are 1-based.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct JobAssignment {
    jobs: HashMap<String, Vec<Vec<String>>>,
}

impl JobAssignment {
    pub fn load<P>(path: P) -> VnResult<Self>
    where
        P: AsRef<Path> + Debug,
    {
        let s = file_util::read_to_string(&path)?;
        let jobs = Self::from_json_str(&s)?;
        info!("loaded job assignment of {} identities from {path:?}", jobs.jobs.len());
        Ok(jobs)
    }

    pub fn from_json_str(s: &str) -> VnResult<Self> {
        serde_json::from_str(s).map_err(to_vn_kind(ErrorKind::InvalidFormat))
    }

    pub fn identities(&self) -> Vec<&str> {
        let mut ids = self.jobs.keys().map(|k| k.as_str()).collect::<Vec<_>>();
        ids.sort();
        ids
    }

    fn sessions(&self, identity: &str) -> VnResult<&[Vec<String>]> {
        self.jobs
            .get(identity)
            .map(|s| s.as_slice())
            .ok_or_else(|| vnerr!(ErrorKind::NotFound; "no jobs assigned to '{}'", identity))
    }

    pub fn session_count(&self, identity: &str) -> VnResult<usize> {
        self.sessions(identity).map(|s| s.len())
    }

    pub fn check_session(&self, identity: &str, session: usize) -> VnResult<()> {
        let n_sessions = self.session_count(identity)?;
        if session == 0 || session > n_sessions {
            Err(vnerr!(
                ErrorKind::OutOfRange;
                "session {} of '{}' is not in 1..={}",
                session,
                identity,
                n_sessions
            ))
        } else {
            Ok(())
        }
    }

    pub fn folders_for(&self, identity: &str, session: usize) -> VnResult<&[String]> {
        self.check_session(identity, session)?;
        Ok(self.sessions(identity)?[session - 1].as_slice())
    }
}

#[cfg(test)]
const JOBS: &str = r#"{
    "anna": [["1", "2", "10"], ["11", "12"]],
    "ben": []
}"#;

#[test]
fn test_bounds() {
    let jobs = JobAssignment::from_json_str(JOBS).unwrap();
    assert_eq!(jobs.identities(), vec!["anna", "ben"]);
    assert_eq!(jobs.session_count("anna").unwrap(), 2);
    assert_eq!(jobs.folders_for("anna", 1).unwrap(), ["1", "2", "10"]);
    assert_eq!(jobs.folders_for("anna", 2).unwrap(), ["11", "12"]);
    for n in [0, 3] {
        assert_eq!(
            jobs.folders_for("anna", n).unwrap_err().kind(),
            ErrorKind::OutOfRange
        );
    }
    assert_eq!(
        jobs.folders_for("ben", 1).unwrap_err().kind(),
        ErrorKind::OutOfRange
    );
    assert_eq!(
        jobs.session_count("carl").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_invalid() {
    let e = JobAssignment::from_json_str(r#"{"anna": [[1, 2]]}"#).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidFormat);
}
