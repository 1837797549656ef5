//! Request DTOs for the cache HTTP surface
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// Request body for `PUT /cache`
///
/// # Fields
/// - `key`: The cache key to store the payload under
/// - `data`: Any JSON value, `null` included; omitting it is an error
/// - `ttl`: Milliseconds until expiry; absent or 0 means never
#[derive(Debug, Clone, Deserialize)]
pub struct SetCacheRequest {
    pub key: String,
    #[serde(default, deserialize_with = "present")]
    pub data: Option<Value>,
    /// Left loosely typed so a non-numeric TTL degrades instead of failing
    #[serde(default)]
    pub ttl: Option<Value>,
}

/// Keeps an explicit `null` as `Some(Value::Null)`; only a missing field is `None`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl SetCacheRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        None
    }

    /// TTL in milliseconds. Anything that is not a number is treated as 0
    /// with a warning; negative numbers are passed through for the cache to
    /// coerce.
    pub fn ttl_ms(&self) -> i64 {
        match &self.ttl {
            None | Some(Value::Null) => 0,
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_u64().map(|v| i64::try_from(v).unwrap_or(i64::MAX)))
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
                .unwrap_or(0),
            Some(other) => {
                warn!(key = %self.key, ttl = %other, "TTL is not a number, using 0");
                0
            }
        }
    }
}
