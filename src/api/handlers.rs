//! API Handlers
//!
//! HTTP request handlers exposing the cache operations.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::Cache;
use crate::error::{CacheError, Result};
use crate::models::{
    GetCacheResponse, HealthResponse, RemoveCacheResponse, SetCacheRequest, SetCacheResponse,
    StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Handle to the cache; clones share one store
    pub cache: Cache,
}

impl AppState {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }
}

/// Handler for `PUT /cache`
///
/// Stores `data` under `key` with an optional TTL in milliseconds.
pub async fn set_cache_handler(
    State(state): State<AppState>,
    Json(req): Json<SetCacheRequest>,
) -> Result<Json<SetCacheResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    state
        .cache
        .set_cache(&req.key, req.data.as_ref(), req.ttl_ms())?;

    Ok(Json(SetCacheResponse::new(req.key)))
}

/// Handler for `GET /cache/:key`
///
/// Absent and expired keys both answer 404.
pub async fn get_cache_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetCacheResponse>> {
    match state.cache.get_cache(&key) {
        Some(data) => Ok(Json(GetCacheResponse::new(key, data))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for `DELETE /cache/:key`
///
/// Always succeeds, whether or not the key existed.
pub async fn remove_cache_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<RemoveCacheResponse> {
    state.cache.remove_cache(&key);
    Json(RemoveCacheResponse::new(key))
}

/// Handler for `GET /stats`
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use crate::timer::{ManualClock, ManualScheduler};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn test_state() -> AppState {
        let scheduler = Arc::new(ManualScheduler::new(Arc::new(ManualClock::new(0))));
        let cache = Cache::open(
            Arc::new(MemoryBackend::new()),
            scheduler.clone(),
            scheduler.clock().clone(),
            "SX-CACHE-KEY",
        );
        AppState::new(cache)
    }

    fn request(key: &str, data: Option<Value>, ttl: Option<Value>) -> SetCacheRequest {
        SetCacheRequest {
            key: key.to_string(),
            data,
            ttl,
        }
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = test_state();

        let req = request("test_key", Some(json!({"x": 1})), Some(json!(60_000)));
        let result = set_cache_handler(State(state.clone()), Json(req)).await;
        assert!(result.is_ok());

        let response = get_cache_handler(State(state.clone()), Path("test_key".to_string()))
            .await
            .unwrap();
        assert_eq!(response.data, json!({"x": 1}));
        assert!(state.cache.is_tracked("test_key"));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = test_state();

        let result = get_cache_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_without_data() {
        let state = test_state();

        let result = set_cache_handler(State(state), Json(request("k", None, None))).await;
        assert!(matches!(result, Err(CacheError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn test_set_with_non_numeric_ttl_is_permanent() {
        let state = test_state();

        let req = request("k", Some(json!("v")), Some(json!("soon")));
        set_cache_handler(State(state.clone()), Json(req)).await.unwrap();

        assert!(!state.cache.is_tracked("k"));
        assert_eq!(state.cache.get_cache("k"), Some(json!("v")));
    }

    #[tokio::test]
    async fn test_remove_handler() {
        let state = test_state();

        let req = request("to_remove", Some(json!("value")), None);
        set_cache_handler(State(state.clone()), Json(req)).await.unwrap();

        let response = remove_cache_handler(State(state.clone()), Path("to_remove".to_string())).await;
        assert_eq!(response.key, "to_remove");

        let result = get_cache_handler(State(state), Path("to_remove".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();
        let _ = get_cache_handler(State(state.clone()), Path("missing".to_string())).await;

        let response = stats_handler(State(state)).await;
        assert_eq!(response.hits, 0);
        assert_eq!(response.misses, 1);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let state = test_state();

        let req = request("", Some(json!("value")), None);
        let result = set_cache_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }
}
