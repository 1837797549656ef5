//! API Module
//!
//! Exposes the cache operations over HTTP.
//!
//! # Endpoints
//! - `PUT /cache` - Store a payload with optional TTL
//! - `GET /cache/:key` - Retrieve a payload
//! - `DELETE /cache/:key` - Remove a key
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::{attach, create_router};
