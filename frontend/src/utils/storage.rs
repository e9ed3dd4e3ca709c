//! Small key/value persistence used for the client session.
//!
//! Mirrors the browser `Storage` surface (`get_item` / `set_item` / `remove_item`) so the
//! session code reads the same whether it is backed by a file or by memory.

use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::error::ClientError;

pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, ClientError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), ClientError>;
    fn remove_item(&self, key: &str) -> Result<(), ClientError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, ClientError> {
        let items = self
            .items
            .lock()
            .map_err(|_| ClientError::Storage("memory storage poisoned".into()))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| ClientError::Storage("memory storage poisoned".into()))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), ClientError> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| ClientError::Storage("memory storage poisoned".into()))?;
        items.remove(key);
        Ok(())
    }
}

/// JSON object on disk; every write replaces the file through a temporary sibling.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, ClientError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                ClientError::Storage(format!("{} is not valid JSON: {}", self.path.display(), e))
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(ClientError::Storage(format!(
                "Failed to read {}: {}",
                self.path.display(),
                err
            ))),
        }
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> Result<(), ClientError> {
        if items.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(err) => Err(ClientError::Storage(format!(
                    "Failed to remove {}: {}",
                    self.path.display(),
                    err
                ))),
            };
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ClientError::Storage(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(items)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).map_err(|e| ClientError::Storage(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| ClientError::Storage(e.to_string()))
    }

    fn with_items<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> (T, bool),
    ) -> Result<T, ClientError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| ClientError::Storage("file storage poisoned".into()))?;
        let mut items = self.read_all()?;
        let (out, dirty) = f(&mut items);
        if dirty {
            self.write_all(&items)?;
        }
        Ok(out)
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, ClientError> {
        self.with_items(|items| (items.get(key).cloned(), false))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.with_items(|items| {
            items.insert(key.to_string(), value.to_string());
            ((), true)
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), ClientError> {
        self.with_items(|items| {
            let dirty = items.remove(key).is_some();
            ((), dirty)
        })
    }
}

pub fn local_storage(path: impl Into<PathBuf>) -> FileStorage {
    FileStorage::new(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_round_trips_items() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("token").unwrap(), None);
        storage.set_item("token", "abc").unwrap();
        assert_eq!(storage.get_item("token").unwrap().as_deref(), Some("abc"));
        storage.remove_item("token").unwrap();
        assert_eq!(storage.get_item("token").unwrap(), None);
    }

    #[test]
    fn file_storage_survives_reopen_and_removes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let storage = local_storage(&path);
        storage.set_item("token", "abc").unwrap();
        storage.set_item("user", "{}").unwrap();
        assert!(path.exists());

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get_item("token").unwrap().as_deref(), Some("abc"));

        reopened.remove_item("token").unwrap();
        reopened.remove_item("user").unwrap();
        assert!(!path.exists());
        reopened.remove_item("user").unwrap();
    }

    #[test]
    fn file_storage_reports_corrupt_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let storage = FileStorage::new(&path);
        let err = storage.get_item("token").unwrap_err();
        assert!(matches!(err, ClientError::Storage(_)));
    }
}
