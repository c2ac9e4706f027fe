//! Durable key-value storage port.
//!
//! The state manager persists its three records (history, documents,
//! credentials) as JSON strings under well-known keys through the
//! [`Storage`] trait. Two backends ship with the crate:
//!
//! - **[`MemoryStorage`]**: `HashMap` behind an `RwLock`; used by tests.
//! - **[`FileStorage`]**: one `<key>.json` file per record in a directory;
//!   used by the CLI.
//!
//! Writes replace the whole value. There are no transactions: a reader may
//! observe a value that a concurrent writer is about to replace.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{FlashError, Result};

pub const HISTORY_KEY: &str = "flashread_history";
pub const DOCUMENTS_KEY: &str = "flashread_documents";
pub const CREDENTIALS_KEY: &str = "flashread_credentials";

pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory storage for tests.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> FlashError {
    FlashError::Storage("storage lock poisoned".to_string())
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().map_err(poisoned)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().map_err(poisoned)?.remove(key);
        Ok(())
    }
}

/// Directory-backed storage: each key lives in `<dir>/<key>.json`.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens (and creates, if needed) the storage directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            FlashError::Storage(format!("cannot create {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FlashError::Storage(format!("read {}: {}", key, e))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        // Write to a sibling temp file then rename so readers never see a torn value.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)
            .and_then(|_| std::fs::rename(&tmp, &path))
            .map_err(|e| FlashError::Storage(format!("write {}: {}", key, e)))
    }

    fn remove(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FlashError::Storage(format!("remove {}: {}", key, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(storage: &dyn Storage) {
        assert_eq!(storage.get(HISTORY_KEY).unwrap(), None);
        storage.set(HISTORY_KEY, "[]").unwrap();
        assert_eq!(storage.get(HISTORY_KEY).unwrap().as_deref(), Some("[]"));
        storage.set(HISTORY_KEY, "[1]").unwrap();
        assert_eq!(storage.get(HISTORY_KEY).unwrap().as_deref(), Some("[1]"));
        storage.remove(HISTORY_KEY).unwrap();
        assert_eq!(storage.get(HISTORY_KEY).unwrap(), None);
        storage.remove(HISTORY_KEY).unwrap();
    }

    #[test]
    fn memory_storage_get_set_remove() {
        exercise(&MemoryStorage::new());
    }

    #[test]
    fn file_storage_get_set_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("nested")).unwrap();
        exercise(&storage);
    }

    #[test]
    fn file_storage_keys_are_independent_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        storage.set(DOCUMENTS_KEY, "[]").unwrap();
        storage.set(CREDENTIALS_KEY, "{}").unwrap();
        assert!(dir.path().join("flashread_documents.json").exists());
        assert!(dir.path().join("flashread_credentials.json").exists());
        assert!(!dir.path().join("flashread_history.json").exists());
    }
}
