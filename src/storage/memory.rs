//! In-memory backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::KvBackend;
use crate::error::StorageError;

/// Key-value backend held in process memory.
///
/// Clones share the same contents, so a second cache opened over a clone sees
/// everything the first one wrote, as it would after a process restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items, including the index key.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KvBackend for MemoryBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }
}
