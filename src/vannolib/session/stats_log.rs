//! Append-only log with one line per persisted checklist, e.g.,
//! `anna_03, 2024-03-01 17:04:11.532113 - 3/5`.
use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;
use std::{
    fmt::{self, Debug, Display, Formatter},
    path::Path,
    str::FromStr,
};
use tracing::warn;

use super::session_label;
use crate::{
    file_util,
    result::{to_vn_kind, ErrorKind, VnError, VnResult},
    util::{format_timestamp, TIMESTAMP_FORMAT},
    vnerr,
};

lazy_static! {
    static ref STAT_LINE_RE: Regex =
        Regex::new(r"^(?P<id>.+)_(?P<session>\d+), (?P<ts>.+) - (?P<done>\d+)/(?P<total>\d+)$")
            .expect("stat line regex broken");
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatLine {
    pub identity: String,
    pub session: usize,
    pub timestamp: NaiveDateTime,
    pub n_done: usize,
    pub n_total: usize,
}

impl Display for StatLine {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{}, {} - {}/{}",
            session_label(&self.identity, self.session),
            format_timestamp(&self.timestamp),
            self.n_done,
            self.n_total
        )
    }
}

impl FromStr for StatLine {
    type Err = VnError;
    fn from_str(s: &str) -> VnResult<Self> {
        let caps = STAT_LINE_RE
            .captures(s.trim())
            .ok_or_else(|| vnerr!(ErrorKind::InvalidFormat; "'{}' is no statistics line", s))?;
        let to_usize = |name: &str| {
            caps[name]
                .parse::<usize>()
                .map_err(to_vn_kind(ErrorKind::InvalidFormat))
        };
        Ok(StatLine {
            identity: caps["id"].to_string(),
            session: to_usize("session")?,
            timestamp: NaiveDateTime::parse_from_str(&caps["ts"], TIMESTAMP_FORMAT)
                .map_err(to_vn_kind(ErrorKind::InvalidFormat))?,
            n_done: to_usize("done")?,
            n_total: to_usize("total")?,
        })
    }
}

pub fn append<P>(path: P, line: &StatLine) -> VnResult<()>
where
    P: AsRef<Path> + Debug,
{
    file_util::append_line(path, &line.to_string())
}

/// All parsable lines of the log. A missing log is empty, unparsable lines are skipped.
pub fn read_all<P>(path: P) -> VnResult<Vec<StatLine>>
where
    P: AsRef<Path> + Debug,
{
    let content = file_util::read_to_string_if_exists(&path)?.unwrap_or_default();
    Ok(content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| match l.parse::<StatLine>() {
            Ok(sl) => Some(sl),
            Err(e) => {
                warn!("skipping line of {path:?} due to {e}");
                None
            }
        })
        .collect())
}

#[cfg(test)]
use crate::{defer_folder_removal, file_util::DEFAULT_TMPDIR};

#[test]
fn test_stat_line() {
    let line = StatLine {
        identity: "anna_b".to_string(),
        session: 3,
        timestamp: NaiveDateTime::parse_from_str("2024-03-01 17:04:11.532113", TIMESTAMP_FORMAT)
            .unwrap(),
        n_done: 3,
        n_total: 5,
    };
    let s = line.to_string();
    assert_eq!(s, "anna_b_03, 2024-03-01 17:04:11.532113 - 3/5");
    assert_eq!(s.parse::<StatLine>().unwrap(), line);
    assert!("anna, x - 1/2".parse::<StatLine>().is_err());
}

#[test]
fn test_append_read() {
    let folder = DEFAULT_TMPDIR.join(format!("stats_{}", uuid::Uuid::new_v4()));
    defer_folder_removal!(&folder);
    let path = folder.join("Statistics.txt");
    assert!(read_all(&path).unwrap().is_empty());
    let mut line = StatLine {
        identity: "ben".to_string(),
        session: 1,
        timestamp: crate::util::now(),
        n_done: 0,
        n_total: 2,
    };
    append(&path, &line).unwrap();
    line.n_done = 1;
    append(&path, &line).unwrap();
    file_util::append_line(&path, "garbage").unwrap();
    let lines = read_all(&path).unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1], line);
}
