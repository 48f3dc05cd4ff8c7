//! File-backed preference storage.
//!
//! Preferences are a flat JSON object of booleans:
//!
//! ```json
//! { "remember_in_store": true }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::traits::{PreferenceError, PreferenceStore};

/// Preferences persisted as JSON in a single file.
///
/// A missing file reads as "nothing set". A corrupt file is logged and also
/// reads as "nothing set"; the next write replaces it. A file that cannot be
/// read at all is never overwritten.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    /// Create a store backed by `path`. The file is not touched until used.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, bool>, PreferenceError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.read_all() {
            Ok(values) => values.get(key).copied(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable preferences");
                None
            }
        }
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), PreferenceError> {
        let mut values = match self.read_all() {
            Ok(values) => values,
            Err(e @ PreferenceError::Parse(_)) => {
                warn!(path = %self.path.display(), error = %e, "Replacing corrupt preferences");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        values.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&values)?;
        std::fs::write(&self.path, json)?;

        debug!(key = %key, value, "Preference saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FilePreferenceStore {
        FilePreferenceStore::new(dir.path().join("nested").join("preferences.json"))
    }

    #[test]
    fn missing_file_reads_as_unset() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.get_bool("remember_in_store"), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn set_creates_parent_and_persists() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.set_bool("remember_in_store", true).unwrap();
        assert!(store.path().exists());

        let reopened = store_in(&dir);
        assert_eq!(reopened.get_bool("remember_in_store"), Some(true));
    }

    #[test]
    fn set_keeps_other_keys() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.set_bool("a", true).unwrap();
        store.set_bool("b", false).unwrap();
        store.set_bool("a", false).unwrap();

        assert_eq!(store.get_bool("a"), Some(false));
        assert_eq!(store.get_bool("b"), Some(false));
    }

    #[test]
    fn corrupt_file_reads_as_unset_and_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FilePreferenceStore::new(&path);
        assert_eq!(store.get_bool("remember_in_store"), None);

        store.set_bool("remember_in_store", true).unwrap();
        assert_eq!(store.get_bool("remember_in_store"), Some(true));
    }

    #[test]
    fn empty_file_reads_as_unset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "").unwrap();

        assert_eq!(FilePreferenceStore::new(path).get_bool("x"), None);
    }

    #[test]
    fn unreadable_file_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        // A directory in place of the file fails to read with an I/O error.
        let path = dir.path().join("preferences.json");
        std::fs::create_dir(&path).unwrap();

        let store = FilePreferenceStore::new(&path);
        let err = store.set_bool("remember_in_store", true).unwrap_err();

        assert!(matches!(err, PreferenceError::Io(_)));
        assert!(path.is_dir());
    }
}
