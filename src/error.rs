//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Storage Error Enum ==
/// Failures reported by a persistent key-value backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing the backing file failed
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing document could not be understood
    #[error("Storage corrupt: {0}")]
    Corrupt(String),

    /// The backing document could not be written out
    #[error("Storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A write was attempted without a payload
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Key not present (or expired) when read over HTTP
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The persistent backend rejected an operation
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
