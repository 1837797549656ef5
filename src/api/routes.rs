//! API Routes
//!
//! Attaches the cache operations to an Axum router.

use axum::{
    routing::{get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    get_cache_handler, health_handler, remove_cache_handler, set_cache_handler, stats_handler,
    AppState,
};
use crate::cache::Cache;

/// Adds the three cache operations to `router`.
///
/// # Endpoints
/// - `PUT /cache` - setCache
/// - `GET /cache/:key` - getCache
/// - `DELETE /cache/:key` - removeCache
pub fn attach(router: Router, cache: Cache) -> Router {
    let cache_routes = Router::new()
        .route("/cache", put(set_cache_handler))
        .route(
            "/cache/:key",
            get(get_cache_handler).delete(remove_cache_handler),
        )
        .with_state(AppState::new(cache));

    router.merge(cache_routes)
}

/// Creates the full router: cache operations plus stats and health.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(cache: Cache) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let status_routes = Router::new()
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .with_state(AppState::new(cache.clone()));

    attach(status_routes, cache)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use crate::timer::{ManualClock, ManualScheduler};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn test_cache() -> Cache {
        let scheduler = Arc::new(ManualScheduler::new(Arc::new(ManualClock::new(0))));
        Cache::open(
            Arc::new(MemoryBackend::new()),
            scheduler.clone(),
            scheduler.clock().clone(),
            "SX-CACHE-KEY",
        )
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_router(test_cache());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_attach_to_host_router() {
        let host = Router::new().route("/host", get(|| async { "host route" }));
        let app = attach(host, test_cache());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/host").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/cache")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"key":"k","data":"v"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let app = create_router(test_cache());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/cache/nonexistent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_set_without_data_is_bad_request() {
        let app = create_router(test_cache());

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/cache")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"key":"k"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
