//! Response DTOs for the cache HTTP surface
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;

/// Response body for `GET /cache/:key`
#[derive(Debug, Clone, Serialize)]
pub struct GetCacheResponse {
    /// The requested key
    pub key: String,
    /// The cached payload
    pub data: Value,
}

impl GetCacheResponse {
    pub fn new(key: impl Into<String>, data: Value) -> Self {
        Self {
            key: key.into(),
            data,
        }
    }
}

/// Response body for `PUT /cache`
#[derive(Debug, Clone, Serialize)]
pub struct SetCacheResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetCacheResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' cached successfully", key),
            key,
        }
    }
}

/// Response body for `DELETE /cache/:key`
#[derive(Debug, Clone, Serialize)]
pub struct RemoveCacheResponse {
    pub message: String,
    pub key: String,
}

impl RemoveCacheResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' removed", key),
            key,
        }
    }
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    /// Expired entries deleted by a read
    pub lazy_expirations: u64,
    /// Expired entries deleted by the sweeper
    pub sweeps: u64,
    /// Keys with a sweep pending
    pub tracked_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            lazy_expirations: stats.lazy_expirations,
            sweeps: stats.sweeps,
            tracked_entries: stats.tracked_entries,
        }
    }
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_response_serialize() {
        let resp = GetCacheResponse::new("test_key", json!({"x": 1}));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json, json!({"key": "test_key", "data": {"x": 1}}));
    }

    #[test]
    fn test_set_response_serialize() {
        let resp = SetCacheResponse::new("my_key");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("my_key"));
        assert!(json.contains("successfully"));
    }

    #[test]
    fn test_remove_response_serialize() {
        let resp = RemoveCacheResponse::new("gone_key");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("gone_key"));
        assert!(json.contains("removed"));
    }

    #[test]
    fn test_stats_response_from_stats() {
        let mut stats = CacheStats::new();
        for _ in 0..4 {
            stats.record_hit();
        }
        stats.record_miss();
        stats.record_sweep();
        stats.set_tracked_entries(2);

        let resp = StatsResponse::from(stats);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.sweeps, 1);
        assert_eq!(resp.tracked_entries, 2);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
