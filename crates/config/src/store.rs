// Key-value stores for snapshot documents
// One JSON document per storage key.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::snapshot::SnapshotError;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, SnapshotError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), SnapshotError>;
    fn remove(&mut self, key: &str) -> Result<(), SnapshotError>;
}

/// In-process store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, SnapshotError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SnapshotError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SnapshotError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Files under a directory, one per key.
///
/// File names are the form-urlencoded key, so the same key maps to the same
/// file on every build and platform, and distinct keys never share a file.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<config dir>/tabview/views`
    pub fn default_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tabview")
            .join("views")
    }

    pub fn open_default() -> Self {
        Self::new(Self::default_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_stem(key: &str) -> String {
        url::form_urlencoded::byte_serialize(key.as_bytes()).collect()
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", Self::file_stem(key)))
    }
}

fn store_error(path: &Path, e: std::io::Error) -> SnapshotError {
    SnapshotError::Store(format!("{}: {}", path.display(), e))
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, SnapshotError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(store_error(&path, e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.dir).map_err(|e| store_error(&self.dir, e))?;
        let path = self.path_for(key);
        fs::write(&path, value).map_err(|e| store_error(&path, e))
    }

    fn remove(&mut self, key: &str) -> Result<(), SnapshotError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(store_error(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "{}").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("{}"));
        store.remove("k").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("views"));

        assert_eq!(store.get("sales-table").unwrap(), None);
        store.set("sales-table", r#"{"version":"0.1"}"#).unwrap();
        assert!(store.path_for("sales-table").exists());
        assert_eq!(store.get("sales-table").unwrap().as_deref(), Some(r#"{"version":"0.1"}"#));

        store.remove("sales-table").unwrap();
        store.remove("sales-table").unwrap();
        assert_eq!(store.get("sales-table").unwrap(), None);
    }

    #[test]
    fn test_keys_map_to_distinct_files() {
        let store = FileStore::new("/tmp/x");
        assert_ne!(store.path_for("a"), store.path_for("b"));
        assert_eq!(store.path_for("a"), store.path_for("a"));
        assert!(store.path_for("a").to_string_lossy().ends_with(".json"));
    }

    #[test]
    fn test_file_names_are_stable() {
        let store = FileStore::new("/tmp/x");
        assert_eq!(store.path_for("sales-table"), Path::new("/tmp/x/sales-table.json"));
        assert_eq!(store.path_for("q3 report/eu"), Path::new("/tmp/x/q3+report%2Feu.json"));
        assert_eq!(store.path_for("caf\u{e9}"), Path::new("/tmp/x/caf%C3%A9.json"));
        // separators never escape the store directory
        assert_eq!(store.path_for("../up").parent(), Some(Path::new("/tmp/x")));
    }

    #[test]
    fn test_stored_file_found_again_by_new_store() {
        let dir = tempdir().unwrap();
        FileStore::new(dir.path()).set("fruit view", "{}").unwrap();
        assert!(dir.path().join("fruit+view.json").is_file());
        assert_eq!(FileStore::new(dir.path()).get("fruit view").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_unwritable_dir_is_store_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let mut store = FileStore::new(blocker.join("views"));
        assert!(matches!(store.set("k", "{}"), Err(SnapshotError::Store(_))));
    }
}
