//! Entry Codec Module
//!
//! Converts between cache entries and the strings handed to the backend.
//!
//! # Wire Format
//! - Structured: `{"time": <expiry ms, 0 = never>, "data": <payload>}`
//! - Fallback: the payload's bare string form, valid forever

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{CacheError, Result};

#[derive(Serialize)]
struct WireRef<'a, T: ?Sized> {
    #[serde(rename = "time")]
    expiry: u64,
    #[serde(rename = "data")]
    payload: &'a T,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WireEntry {
    #[serde(rename = "time")]
    expiry: u64,
    #[serde(rename = "data")]
    payload: Value,
}

// == Encoded Entry ==
/// String produced for the backend by `encode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedEntry {
    pub raw: String,
    /// Absolute expiry in Unix ms (0 = never); `None` for the fallback form,
    /// which carries no expiry at all
    pub expiry: Option<u64>,
}

impl EncodedEntry {
    pub fn is_structured(&self) -> bool {
        self.expiry.is_some()
    }
}

// == Decoded Entry ==
/// Result of reading a stored string back.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEntry {
    /// Written by `encode`; subject to expiry
    Structured { expiry: u64, payload: Value },
    /// Anything else; returned as-is and never expires
    Bare(Value),
}

impl DecodedEntry {
    /// Whether the entry is still valid at `now_ms`. Expired once `now >= expiry`.
    pub fn is_live(&self, now_ms: u64) -> bool {
        match self {
            DecodedEntry::Structured { expiry, .. } => *expiry == 0 || *expiry > now_ms,
            DecodedEntry::Bare(_) => true,
        }
    }

    pub fn into_payload(self) -> Value {
        match self {
            DecodedEntry::Structured { payload, .. } | DecodedEntry::Bare(payload) => payload,
        }
    }
}

// == Encode ==
/// Serializes `payload` with an expiry `ttl_ms` from `now_ms`.
///
/// # Errors
/// `CacheError::InvalidPayload` when `payload` is `None`.
pub fn encode<T>(payload: Option<&T>, ttl_ms: u64, now_ms: u64) -> Result<EncodedEntry>
where
    T: Serialize + Debug + ?Sized,
{
    let payload = payload.ok_or_else(|| CacheError::InvalidPayload("data is absent".into()))?;
    let expiry = if ttl_ms == 0 {
        0
    } else {
        now_ms.saturating_add(ttl_ms)
    };

    match serde_json::to_string(&WireRef { expiry, payload }) {
        Ok(raw) => Ok(EncodedEntry {
            raw,
            expiry: Some(expiry),
        }),
        Err(e) => {
            warn!(error = %e, "Payload is not serializable, storing its debug form without expiry");
            Ok(EncodedEntry {
                raw: format!("{:?}", payload),
                expiry: None,
            })
        }
    }
}

// == Decode ==
/// Interprets a string read from the backend. An absent or empty value
/// decodes to `None`.
pub fn decode(raw: Option<&str>) -> Option<DecodedEntry> {
    let raw = raw.filter(|raw| !raw.is_empty())?;

    if let Ok(entry) = serde_json::from_str::<WireEntry>(raw) {
        return Some(DecodedEntry::Structured {
            expiry: entry.expiry,
            payload: entry.payload,
        });
    }

    Some(match serde_json::from_str::<Value>(raw) {
        Ok(value) => DecodedEntry::Bare(value),
        Err(_) => DecodedEntry::Bare(Value::String(raw.to_string())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_encode_permanent() {
        let encoded = encode(Some(&json!({"x": 1})), 0, 5_000).unwrap();
        assert_eq!(encoded.raw, r#"{"time":0,"data":{"x":1}}"#);
        assert_eq!(encoded.expiry, Some(0));
    }

    #[test]
    fn test_encode_with_ttl() {
        let encoded = encode(Some("hello"), 100, 5_000).unwrap();
        assert_eq!(encoded.raw, r#"{"time":5100,"data":"hello"}"#);
        assert!(encoded.is_structured());
    }

    #[test]
    fn test_encode_null_is_a_payload() {
        let encoded = encode(Some(&Value::Null), 0, 0).unwrap();
        assert_eq!(encoded.raw, r#"{"time":0,"data":null}"#);
    }

    #[test]
    fn test_encode_absent_payload() {
        let result = encode::<Value>(None, 0, 0);
        assert!(matches!(result, Err(CacheError::InvalidPayload(_))));
    }

    #[test]
    fn test_encode_unserializable_falls_back() {
        // JSON object keys must be strings
        let mut payload = HashMap::new();
        payload.insert((1, 2), "pair");

        let encoded = encode(Some(&payload), 1_000, 0).unwrap();
        assert_eq!(encoded.expiry, None);
        assert!(!encoded.is_structured());
        assert_eq!(encoded.raw, format!("{:?}", payload));
    }

    #[test]
    fn test_decode_absent() {
        assert_eq!(decode(None), None);
    }

    #[test]
    fn test_decode_empty_is_absent() {
        assert_eq!(decode(Some("")), None);
        assert_eq!(decode(Some(" ")), Some(DecodedEntry::Bare(json!(" "))));
    }

    #[test]
    fn test_decode_structured() {
        let decoded = decode(Some(r#"{"time":42,"data":[1,2]}"#)).unwrap();
        assert_eq!(
            decoded,
            DecodedEntry::Structured {
                expiry: 42,
                payload: json!([1, 2])
            }
        );
    }

    #[test]
    fn test_decode_unparseable_is_bare_string() {
        let decoded = decode(Some("plain text")).unwrap();
        assert_eq!(decoded, DecodedEntry::Bare(json!("plain text")));
        assert!(decoded.is_live(u64::MAX));
    }

    #[test]
    fn test_decode_json_string_is_bare() {
        let decoded = decode(Some(r#""quoted""#)).unwrap();
        assert_eq!(decoded, DecodedEntry::Bare(json!("quoted")));
    }

    #[test]
    fn test_decode_other_shapes_are_bare() {
        assert_eq!(decode(Some("17")).unwrap(), DecodedEntry::Bare(json!(17)));
        assert_eq!(
            decode(Some(r#"{"time":1,"data":2,"extra":3}"#)).unwrap(),
            DecodedEntry::Bare(json!({"time": 1, "data": 2, "extra": 3}))
        );
        assert_eq!(
            decode(Some(r#"{"time":"soon","data":2}"#)).unwrap(),
            DecodedEntry::Bare(json!({"time": "soon", "data": 2}))
        );
    }

    #[test]
    fn test_liveness_boundary() {
        let entry = DecodedEntry::Structured {
            expiry: 1_000,
            payload: json!(1),
        };
        assert!(entry.is_live(999));
        assert!(!entry.is_live(1_000), "Entry should be expired at its deadline");

        let permanent = DecodedEntry::Structured {
            expiry: 0,
            payload: json!(1),
        };
        assert!(permanent.is_live(u64::MAX));
    }
}
