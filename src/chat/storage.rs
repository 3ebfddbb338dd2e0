//! Storage port for the chat history blob.
//!
//! The chat store only ever reads and writes one serialized value
//! under a single key, so the port is a three method interface. Use
//! `MemoryStorage` in tests and `FileStorage` everywhere else.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Fixed key the history is stored under.
pub const STORAGE_KEY: &str = "chatbot_history";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),

    #[error("storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub trait Storage {
    /// Returns `None` when nothing has been written yet.
    fn read(&self) -> Result<Option<String>, StorageError>;
    fn write(&self, blob: &str) -> Result<(), StorageError>;
    fn remove(&self) -> Result<(), StorageError>;
}

/// In-memory storage. Clones share the same underlying slot so a test
/// can inspect what a store wrote.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: &str) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(blob.to_string()))),
        }
    }
}

impl Storage for MemoryStorage {
    fn read(&self) -> Result<Option<String>, StorageError> {
        let slot = self
            .slot
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(slot.clone())
    }

    fn write(&self, blob: &str) -> Result<(), StorageError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        *slot = Some(blob.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<(), StorageError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        *slot = None;
        Ok(())
    }
}

/// Stores the blob as `<dir>/chatbot_history.json`.
#[derive(Clone, Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("{}.json", STORAGE_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for FileStorage {
    fn read(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, blob: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Readers only ever see a complete blob
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, blob)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn remove(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_clones_share_state() {
        let storage = MemoryStorage::new();
        let other = storage.clone();
        storage.write("[]").unwrap();
        assert_eq!(other.read().unwrap(), Some("[]".to_string()));
        other.remove().unwrap();
        assert_eq!(storage.read().unwrap(), None);
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        assert_eq!(storage.read().unwrap(), None);

        storage.write(r#"[{"id":"a"}]"#).unwrap();
        assert!(storage.path().ends_with("chatbot_history.json"));
        assert_eq!(storage.read().unwrap(), Some(r#"[{"id":"a"}]"#.to_string()));

        storage.remove().unwrap();
        assert_eq!(storage.read().unwrap(), None);
        // Removing twice is fine
        storage.remove().unwrap();
    }

    #[test]
    fn test_file_storage_creates_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(&dir.path().join("nested").join("deeper"));
        storage.write("[]").unwrap();
        assert_eq!(storage.read().unwrap(), Some("[]".to_string()));
    }
}
