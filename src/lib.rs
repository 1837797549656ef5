//! SX Cache - An expiring key-value cache over persistent storage
//!
//! Entries carry an absolute expiry, are swept by timers when it passes, and
//! are also checked on read. The expiry index survives restarts so sweeps
//! resume where they left off.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod timer;

pub use api::{attach, create_router, AppState};
pub use cache::Cache;
pub use config::Config;
pub use error::{CacheError, Result, StorageError};
pub use storage::{FileBackend, KvBackend, MemoryBackend};
