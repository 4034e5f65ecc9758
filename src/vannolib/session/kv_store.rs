use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, path::PathBuf};
use tracing::{info, warn};

use super::EnvPaths;
use crate::{
    file_util,
    result::{to_vn, to_vn_kind, ErrorKind, VnResult},
};

const KV_FILE: &str = "kv.json";

/// Small key-value store of one identity. Each mutation is flushed to disk atomically, on failure
/// the in-memory state is rolled back.
#[derive(Clone, Debug, PartialEq)]
pub struct KvStore {
    namespace: String,
    path: PathBuf,
    data: BTreeMap<String, Value>,
}

impl KvStore {
    pub fn open(env: &EnvPaths, identity: &str) -> VnResult<Self> {
        let path = env.kv_namespace(identity).join(KV_FILE);
        let data = match file_util::read_to_string_if_exists(&path)? {
            Some(s) => serde_json::from_str(&s).map_err(to_vn_kind(ErrorKind::InvalidFormat))?,
            None => BTreeMap::new(),
        };
        info!("opened key-value store {path:?}");
        Ok(KvStore {
            namespace: identity.to_string(),
            path,
            data,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `Ok(None)` if the key is absent, an error if the stored value has another type.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> VnResult<Option<T>> {
        self.data
            .get(key)
            .map(|v| serde_json::from_value(v.clone()).map_err(to_vn_kind(ErrorKind::InvalidFormat)))
            .transpose()
    }

    pub fn put<T: Serialize>(&mut self, key: &str, value: &T) -> VnResult<()> {
        let value = serde_json::to_value(value).map_err(to_vn)?;
        let prev = self.data.insert(key.to_string(), value);
        if let Err(e) = self.flush() {
            self.rollback(key, prev);
            return Err(e);
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> VnResult<Option<Value>> {
        let prev = self.data.remove(key);
        if prev.is_some() {
            if let Err(e) = self.flush() {
                self.rollback(key, prev);
                return Err(e);
            }
        }
        Ok(prev)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(|k| k.as_str())
    }

    fn rollback(&mut self, key: &str, prev: Option<Value>) {
        warn!("rolling back key '{key}' of store '{}'", self.namespace);
        match prev {
            Some(v) => self.data.insert(key.to_string(), v),
            None => self.data.remove(key),
        };
    }

    fn flush(&self) -> VnResult<()> {
        let s = serde_json::to_string_pretty(&self.data).map_err(to_vn)?;
        file_util::write_atomic(&self.path, s)
    }
}

#[test]
fn test_kv_store() {
    use crate::{defer_folder_removal, file_util::DEFAULT_TMPDIR};
    let folder = DEFAULT_TMPDIR.join(format!("kv_{}", uuid::Uuid::new_v4()));
    defer_folder_removal!(&folder);
    let env = EnvPaths::new(folder.clone(), folder.join("res"), folder.join("ids.txt"));
    let mut kv = KvStore::open(&env, "anna").unwrap();
    assert_eq!(kv.namespace(), "anna");
    assert_eq!(kv.get::<Vec<u64>>("checklist/01").unwrap(), None);
    kv.put("checklist/01", &vec![1u64, 5]).unwrap();
    kv.put("note", &"hello").unwrap();

    let mut kv = KvStore::open(&env, "anna").unwrap();
    assert_eq!(
        kv.get::<Vec<u64>>("checklist/01").unwrap(),
        Some(vec![1, 5])
    );
    assert_eq!(kv.keys().collect::<Vec<_>>(), vec!["checklist/01", "note"]);
    assert!(kv.get::<u64>("note").is_err());
    assert!(kv.remove("note").unwrap().is_some());
    assert!(kv.remove("note").unwrap().is_none());

    let other = KvStore::open(&env, "ben").unwrap();
    assert_eq!(other.keys().count(), 0);
}
