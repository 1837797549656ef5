//! File-backed backend.
//!
//! The whole store is one JSON object on disk. Every mutation rewrites it via
//! a temporary file and an atomic rename, so a crash never leaves a torn file.
//!
//! Writes are synchronous and happen under the cache lock, on whichever
//! thread called in (HTTP handlers and timer tasks included). Fine for small
//! stores; a large one should move cache calls onto `spawn_blocking`.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::KvBackend;
use crate::error::StorageError;

type Items = BTreeMap<String, String>;

/// Key-value backend persisted to a single JSON file.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    items: Mutex<Items>,
}

impl FileBackend {
    // == Open ==
    /// Opens the store at `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    /// - `StorageError::Io` if the file exists but cannot be read
    /// - `StorageError::Corrupt` if the file is not a JSON object of strings
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let items = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Items::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                StorageError::Corrupt(format!("{}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => Items::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), items = items.len(), "Opened file backend");

        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Items> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Flush ==
    fn flush(&self, items: &Items) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let body = serde_json::to_vec(items)?;
        fs::write(&tmp_path, body)?;
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }
}

impl KvBackend for FileBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.lock();
        let previous = items.insert(key.to_string(), value.to_string());

        if let Err(e) = self.flush(&items) {
            match previous {
                Some(old) => items.insert(key.to_string(), old),
                None => items.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.lock();
        let Some(previous) = items.remove(key) else {
            return Ok(());
        };

        if let Err(e) = self.flush(&items) {
            items.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }
}
