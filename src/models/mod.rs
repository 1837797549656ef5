//! Request and Response models for the cache HTTP surface
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::SetCacheRequest;
pub use responses::{
    ErrorResponse, GetCacheResponse, HealthResponse, RemoveCacheResponse, SetCacheResponse,
    StatsResponse,
};
