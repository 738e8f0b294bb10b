// SPDX-License-Identifier: Apache-2.0

//! JSON credential store.
//!
//! The store is a single JSON document holding one object per service
//! (`bitbucket`, `gmail`, `jira`, `notification`). It is read wholesale at
//! start-up and rewritten wholesale after every write, so exchanged OAuth
//! tokens survive between runs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::error::NotifyError;

/// A single dotted-path write, e.g. `bitbucket.accessToken`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEntry {
    /// Dotted path to the leaf.
    pub key: String,
    /// Value to set at the leaf.
    pub value: Value,
}

impl StoreEntry {
    /// Creates an entry for the given dotted path.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Typed token update for one service.
///
/// Turned into `<service>.accessToken` and (when present)
/// `<service>.refreshToken` writes.
#[derive(Debug, Clone)]
pub struct TokenPatch<'a> {
    /// Top-level section of the service.
    pub service: &'a str,
    /// New access token.
    pub access_token: &'a str,
    /// New refresh token, if the exchange returned one.
    pub refresh_token: Option<&'a str>,
}

impl TokenPatch<'_> {
    fn entries(&self) -> Vec<StoreEntry> {
        let mut entries = vec![StoreEntry::new(
            format!("{}.accessToken", self.service),
            self.access_token,
        )];
        if let Some(refresh) = self.refresh_token {
            entries.push(StoreEntry::new(
                format!("{}.refreshToken", self.service),
                refresh,
            ));
        }
        entries
    }
}

/// In-memory view of the JSON configuration document plus its location.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    tree: Mutex<Value>,
}

impl CredentialStore {
    /// Reads and parses the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::ConfigUnreadable`] if the file cannot be read and
    /// [`NotifyError::ConfigMalformed`] if it is not a JSON object.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn read(path: impl AsRef<Path>) -> Result<Self, NotifyError> {
        let path = path.as_ref().to_path_buf();
        let contents =
            fs::read_to_string(&path).map_err(|source| NotifyError::ConfigUnreadable {
                path: path.clone(),
                source,
            })?;

        let tree: Value =
            serde_json::from_str(&contents).map_err(|e| NotifyError::ConfigMalformed {
                path: path.clone(),
                message: e.to_string(),
            })?;

        if !tree.is_object() {
            return Err(NotifyError::ConfigMalformed {
                path,
                message: "top-level value must be an object".to_string(),
            });
        }

        debug!("Configuration loaded");
        Ok(Self {
            path,
            tree: Mutex::new(tree),
        })
    }

    /// Location the store was read from and is written back to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a copy of the whole tree.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        self.lock().clone()
    }

    /// Returns a copy of the value at a dotted path, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let tree = self.lock();
        key.split('.')
            .try_fold(&*tree, |node, segment| node.get(segment))
            .cloned()
    }

    /// Deserialises a top-level section into a typed struct.
    ///
    /// Returns `Ok(None)` when the section is absent.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::InvalidSection`] if the section does not match `T`.
    pub fn section<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, NotifyError> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| NotifyError::InvalidSection {
                section: name.to_string(),
                message: e.to_string(),
            })
    }

    /// Applies dotted-path writes and rewrites the whole file.
    ///
    /// The document is written to a sibling `.tmp` file and renamed over the
    /// store, so an interrupted write leaves the previous file intact.
    ///
    /// Intermediate objects are created as needed; a non-object node on the
    /// path is replaced by an object. The in-memory tree keeps the new values
    /// even if the file write fails.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::ConfigWriteFailed`] if serialisation or the file
    /// write fails.
    #[instrument(skip(self, entries), fields(path = %self.path.display(), count = entries.len()))]
    pub fn write(&self, entries: &[StoreEntry]) -> Result<(), NotifyError> {
        let contents = {
            let mut tree = self.lock();
            for entry in entries {
                set_path(&mut tree, &entry.key, entry.value.clone());
            }
            serde_json::to_string_pretty(&*tree).map_err(|e| NotifyError::ConfigWriteFailed {
                path: self.path.clone(),
                message: e.to_string(),
            })?
        };

        // Atomic write: write to temp file, then rename
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, contents).map_err(|e| NotifyError::ConfigWriteFailed {
            path: self.path.clone(),
            message: format!("cannot write temp file {}: {e}", temp_path.display()),
        })?;

        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(NotifyError::ConfigWriteFailed {
                path: self.path.clone(),
                message: format!("cannot replace file: {e}"),
            });
        }

        info!("Tokens are successfully written");
        Ok(())
    }

    /// Persists a token exchange result for one service.
    ///
    /// # Errors
    ///
    /// See [`CredentialStore::write`].
    pub fn persist(&self, patch: &TokenPatch<'_>) -> Result<(), NotifyError> {
        self.write(&patch.entries())
    }

    fn lock(&self) -> MutexGuard<'_, Value> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Walks `key` through `tree`, creating objects along the way, and sets the leaf.
fn set_path(tree: &mut Value, key: &str, value: Value) {
    let mut node = tree;
    let mut segments = key.split('.').peekable();

    while let Some(segment) = segments.next() {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn store_with(contents: &str) -> (tempfile::NamedTempFile, CredentialStore) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let store = CredentialStore::read(file.path()).unwrap();
        (file, store)
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = CredentialStore::read(dir.path().join("missing.json"));
        assert!(matches!(result, Err(NotifyError::ConfigUnreadable { .. })));
    }

    #[test]
    fn test_read_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{invalidJSON}").unwrap();
        let result = CredentialStore::read(file.path());
        assert!(matches!(result, Err(NotifyError::ConfigMalformed { .. })));
    }

    #[test]
    fn test_read_rejects_non_object() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[1, 2]").unwrap();
        let result = CredentialStore::read(file.path());
        assert!(matches!(result, Err(NotifyError::ConfigMalformed { .. })));
    }

    #[test]
    fn test_read_configuration_content() {
        let (_file, store) = store_with(r#"{"jane": "doe"}"#);
        assert_eq!(store.snapshot(), json!({"jane": "doe"}));
        assert_eq!(store.get("jane"), Some(json!("doe")));
        assert_eq!(store.get("jane.doe"), None);
    }

    #[test]
    fn test_write_round_trip_keeps_siblings() {
        let (file, store) = store_with(
            r#"{"bitbucket": {"clientId": "id", "accessToken": "old"}, "gmail": {"user": "jane"}}"#,
        );

        store
            .write(&[StoreEntry::new("bitbucket.accessToken", "X")])
            .unwrap();

        let reread = CredentialStore::read(file.path()).unwrap();
        assert_eq!(reread.get("bitbucket.accessToken"), Some(json!("X")));
        assert_eq!(reread.get("bitbucket.clientId"), Some(json!("id")));
        assert_eq!(reread.get("gmail.user"), Some(json!("jane")));
    }

    #[test]
    fn test_write_creates_missing_parents() {
        let (file, store) = store_with(r#"{"jane": "doe"}"#);

        store
            .write(&[StoreEntry::new("foobar.foo.bar", "baz")])
            .unwrap();

        let reread = CredentialStore::read(file.path()).unwrap();
        assert_eq!(reread.get("foobar.foo.bar"), Some(json!("baz")));
        assert_eq!(reread.get("jane"), Some(json!("doe")));
    }

    #[test]
    fn test_write_replaces_scalar_on_path() {
        let (_file, store) = store_with(r#"{"jane": "doe"}"#);
        store.write(&[StoreEntry::new("jane.doe", "foobar")]).unwrap();
        assert_eq!(store.snapshot(), json!({"jane": {"doe": "foobar"}}));
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let (file, store) = store_with(r#"{"jane": "doe"}"#);
        let dir = file.path().with_extension("d");
        std::fs::create_dir(&dir).unwrap();
        let broken = CredentialStore {
            path: dir.clone(),
            tree: Mutex::new(store.snapshot()),
        };

        let result = broken.write(&[StoreEntry::new("jane", "smith")]);

        assert!(matches!(result, Err(NotifyError::ConfigWriteFailed { .. })));
        assert_eq!(broken.get("jane"), Some(json!("smith")));
        std::fs::remove_dir(dir).unwrap();
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"bitbucket": {"accessToken": "old"}}"#).unwrap();
        let store = CredentialStore::read(&path).unwrap();

        store
            .write(&[StoreEntry::new("bitbucket.accessToken", "new")])
            .unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["config.json"]);
        assert!(!path.with_extension("tmp").exists());
        let reread = CredentialStore::read(&path).unwrap();
        assert_eq!(reread.get("bitbucket.accessToken"), Some(json!("new")));
    }

    #[test]
    fn test_failed_replace_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("config.json");
        std::fs::create_dir(&target).unwrap();
        let store = CredentialStore {
            path: target.clone(),
            tree: Mutex::new(json!({"jane": "doe"})),
        };

        let result = store.write(&[StoreEntry::new("jane", "smith")]);

        assert!(matches!(result, Err(NotifyError::ConfigWriteFailed { .. })));
        assert!(target.is_dir());
        assert!(!target.with_extension("tmp").exists());
    }

    #[test]
    fn test_persist_token_patch() {
        let (file, store) = store_with(r#"{"bitbucket": {"refreshToken": "r0"}}"#);

        store
            .persist(&TokenPatch {
                service: "bitbucket",
                access_token: "a1",
                refresh_token: None,
            })
            .unwrap();
        let reread = CredentialStore::read(file.path()).unwrap();
        assert_eq!(reread.get("bitbucket.accessToken"), Some(json!("a1")));
        assert_eq!(reread.get("bitbucket.refreshToken"), Some(json!("r0")));

        store
            .persist(&TokenPatch {
                service: "bitbucket",
                access_token: "a2",
                refresh_token: Some("r2"),
            })
            .unwrap();
        let reread = CredentialStore::read(file.path()).unwrap();
        assert_eq!(reread.get("bitbucket.accessToken"), Some(json!("a2")));
        assert_eq!(reread.get("bitbucket.refreshToken"), Some(json!("r2")));
    }

    #[test]
    fn test_section_absent_is_none() {
        let (_file, store) = store_with(r#"{"jane": "doe"}"#);
        let section: Option<serde_json::Map<String, Value>> = store.section("jira").unwrap();
        assert!(section.is_none());
    }
}
