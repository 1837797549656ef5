//! Cache Module
//!
//! Expiring cache layered over a persistent key-value backend, with lazy
//! expiry on read and timer-driven sweeping.

pub mod codec;
mod index;
mod stats;
mod store;
mod sweeper;


// Re-export public types
pub use codec::{DecodedEntry, EncodedEntry};
pub use index::{ExpiryIndex, IndexEntry};
pub use stats::CacheStats;
pub use store::{Cache, CacheStore};
pub use sweeper::{Armed, ArmedTimer, Sweeper};
