//! Storage Module
//!
//! The persistent key-value store the cache is layered on. Backends are
//! synchronous, string-keyed and string-valued.

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use crate::error::StorageError;

// == Backend Trait ==
/// A synchronous, process-wide key-value store.
///
/// Implementations use interior mutability so a single backend can be shared
/// between the cache and anything else that reads the same storage.
pub trait KvBackend: Send + Sync {
    /// Returns the stored string for `key`, or `None` if absent.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}
