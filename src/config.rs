//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Storage key reserved for the serialized expiry index.
pub const DEFAULT_INDEX_KEY: &str = "SX-CACHE-KEY";

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Storage key under which the expiry index is persisted
    pub index_key: String,
    /// Path of the file backing the persistent key-value store
    pub storage_path: PathBuf,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_INDEX_KEY` - Reserved index key (default: `SX-CACHE-KEY`)
    /// - `CACHE_STORAGE_PATH` - Backing file path (default: `sx-cache.json`)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            index_key: env::var("CACHE_INDEX_KEY")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.index_key),
            storage_path: env::var("CACHE_STORAGE_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_path),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_key: DEFAULT_INDEX_KEY.to_string(),
            storage_path: PathBuf::from("sx-cache.json"),
            server_port: 3000,
        }
    }
}
