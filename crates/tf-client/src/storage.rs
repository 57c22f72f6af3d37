//! Durable key-value storage
//!
//! Values are opaque JSON strings stored under versioned keys. Reads never
//! fail: missing or corrupt data falls back to the caller's default. Writes
//! are best effort and only logged on failure.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Debug;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// IO error on a key's backing file
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Value could not be encoded
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StorageError {
    fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// String key-value storage
pub trait KeyValueStorage: Send + Sync + Debug {
    /// Raw value for key
    fn get(&self, key: &str) -> Option<String>;

    /// Store raw value
    ///
    /// # Errors
    /// [`StorageError`] when the value cannot be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete key (missing keys are fine)
    ///
    /// # Errors
    /// [`StorageError`] when the backing entry cannot be removed.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Decode JSON under `key`, or return `fallback`
pub fn read_json<T: DeserializeOwned>(storage: &dyn KeyValueStorage, key: &str, fallback: T) -> T {
    let Some(raw) = storage.get(key) else {
        return fallback;
    };
    if raw.is_empty() {
        return fallback;
    }
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "discarding corrupt stored value");
            fallback
        }
    }
}

/// Encode `value` as JSON under `key`
///
/// Failures are logged, not returned.
pub fn write_json<T: Serialize + ?Sized>(storage: &dyn KeyValueStorage, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(StorageError::from)
        .and_then(|raw| storage.set(key, &raw));
    if let Err(e) = result {
        tracing::warn!(key, error = %e, "failed to persist value");
    }
}

/// In-memory storage (tests, ephemeral sessions)
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create empty storage
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Directory-backed storage, one `<key>.json` file per key
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open (and create) the storage directory
    ///
    /// # Errors
    /// [`StorageError::Io`] when the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| StorageError::io(&root, e))?;
        Ok(Self { root })
    }

    /// Storage directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{name}.json"))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let mut tmp = NamedTempFile::new_in(&self.root).map_err(|e| StorageError::io(&self.root, e))?;
        tmp.write_all(value.as_bytes())
            .map_err(|e| StorageError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map(|_| ())
            .map_err(|e| StorageError::io(&path, e.error))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Blob {
        n: u32,
    }

    #[test]
    fn missing_and_corrupt_fall_back() {
        let storage = MemoryStorage::new();
        assert_eq!(read_json(&storage, "k", Blob { n: 7 }), Blob { n: 7 });

        storage.set("k", "{not json").unwrap();
        assert_eq!(read_json(&storage, "k", Blob { n: 7 }), Blob { n: 7 });

        storage.set("k", "").unwrap();
        assert_eq!(read_json(&storage, "k", Blob { n: 7 }), Blob { n: 7 });
    }

    #[test]
    fn write_then_read() {
        let storage = MemoryStorage::new();
        write_json(&storage, "k", &Blob { n: 3 });
        assert_eq!(read_json(&storage, "k", Blob { n: 0 }), Blob { n: 3 });
    }

    #[test]
    fn null_reads_back_as_none() {
        let storage = MemoryStorage::new();
        write_json(&storage, "k", &None::<Blob>);
        assert_eq!(storage.get("k").as_deref(), Some("null"));
        assert_eq!(read_json::<Option<Blob>>(&storage, "k", Some(Blob { n: 1 })), None);
    }

    #[test]
    fn file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let first = FileStorage::open(dir.path()).unwrap();
        write_json(&first, "taskflow_pro_session_v1", &Blob { n: 9 });

        let second = FileStorage::open(dir.path()).unwrap();
        assert_eq!(
            read_json(&second, "taskflow_pro_session_v1", Blob { n: 0 }),
            Blob { n: 9 }
        );

        second.remove("taskflow_pro_session_v1").unwrap();
        second.remove("taskflow_pro_session_v1").unwrap();
        assert!(second.get("taskflow_pro_session_v1").is_none());
    }

    #[test]
    fn file_storage_sanitizes_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        storage.set("../escape", "1").unwrap();
        assert!(dir.path().join("___escape.json").exists());
    }

    #[test]
    fn concurrent_writes_to_one_key_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        std::thread::scope(|scope| {
            for writer in 0..4 {
                let storage = &storage;
                scope.spawn(move || {
                    for round in 0..25 {
                        storage.set("shared", &format!("{writer}:{round}")).unwrap();
                    }
                });
            }
        });

        let last = storage.get("shared").unwrap();
        let (writer, round) = last.split_once(':').unwrap();
        assert!(writer.parse::<u8>().unwrap() < 4);
        assert!(round.parse::<u8>().unwrap() < 25);
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
