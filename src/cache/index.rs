//! Expiry Index Module
//!
//! Tracks which keys have a sweep pending and when they were written, mirrored
//! to the backend under a reserved key so timers can be re-armed after restart.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::sweeper::ArmedTimer;
use crate::error::StorageError;
use crate::storage::KvBackend;

// == Index Entry ==
/// Scheduled-removal metadata for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub key: String,
    pub ttl_millis: u64,
    /// Unix ms at which the entry was written
    pub created_at: u64,
    /// Live timer; never persisted
    #[serde(skip)]
    pub timer: Option<ArmedTimer>,
}

impl IndexEntry {
    pub fn new(key: impl Into<String>, ttl_millis: u64, created_at: u64) -> Self {
        Self {
            key: key.into(),
            ttl_millis,
            created_at,
            timer: None,
        }
    }

    /// Milliseconds left until the deadline; zero or negative once passed.
    /// Saturates at the `i64` bounds for deadlines beyond them.
    pub fn remaining_ms(&self, now_ms: u64) -> i64 {
        let remaining =
            i128::from(self.created_at) + i128::from(self.ttl_millis) - i128::from(now_ms);
        remaining.clamp(i64::MIN.into(), i64::MAX.into()) as i64
    }
}

// == Expiry Index ==
/// In-memory map of tracked keys plus its persistence under `reserved_key`.
#[derive(Debug)]
pub struct ExpiryIndex {
    reserved_key: String,
    entries: HashMap<String, IndexEntry>,
}

impl ExpiryIndex {
    pub fn new(reserved_key: impl Into<String>) -> Self {
        Self {
            reserved_key: reserved_key.into(),
            entries: HashMap::new(),
        }
    }

    // == Load ==
    /// Reads the index from `backend`. Absence, read failure, or a document
    /// that does not parse all yield an empty index.
    pub fn load(backend: &dyn KvBackend, reserved_key: impl Into<String>) -> Self {
        let mut index = Self::new(reserved_key);

        let raw = match backend.get_item(&index.reserved_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return index,
            Err(e) => {
                warn!(error = %e, "Could not read expiry index, starting empty");
                return index;
            }
        };

        match serde_json::from_str::<HashMap<String, IndexEntry>>(&raw) {
            Ok(entries) => {
                index.entries = entries
                    .into_iter()
                    .filter(|(key, _)| *key != index.reserved_key)
                    .collect();
            }
            Err(e) => warn!(error = %e, "Expiry index is corrupt, starting empty"),
        }
        index
    }

    // == Persist ==
    /// Writes the whole index to the reserved key.
    pub fn persist(&self, backend: &dyn KvBackend) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&self.entries)?;
        backend.set_item(&self.reserved_key, &raw)
    }

    pub fn is_reserved(&self, key: &str) -> bool {
        key == self.reserved_key
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut IndexEntry> {
        self.entries.get_mut(key)
    }

    /// Inserts `entry`, returning the one it replaced. The reserved key is
    /// never tracked; such an entry is handed straight back.
    pub fn insert(&mut self, entry: IndexEntry) -> Option<IndexEntry> {
        if self.is_reserved(&entry.key) {
            return Some(entry);
        }
        self.entries.insert(entry.key.clone(), entry)
    }

    pub fn remove(&mut self, key: &str) -> Option<IndexEntry> {
        self.entries.remove(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
