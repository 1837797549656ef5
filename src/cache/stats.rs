//! Cache Statistics Module
//!
//! Tracks reads and the two ways entries expire: lazily on read, or swept.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache activity counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Reads that returned a payload
    pub hits: u64,
    /// Reads that returned nothing (absent, expired, or unreadable)
    pub misses: u64,
    /// Expired entries found and deleted by a read
    pub lazy_expirations: u64,
    /// Entries deleted by the sweeper
    pub sweeps: u64,
    /// Keys with a sweep currently pending
    pub tracked_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if nothing has been read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Lazy Expiration ==
    /// Counts an expired entry removed by a read.
    pub fn record_lazy_expiration(&mut self) {
        self.lazy_expirations += 1;
    }

    // == Record Sweep ==
    /// Counts an entry removed by its timer or during replay.
    pub fn record_sweep(&mut self) {
        self.sweeps += 1;
    }

    // == Update Tracked Count ==
    /// Updates the number of keys with a pending sweep.
    pub fn set_tracked_entries(&mut self, count: usize) {
        self.tracked_entries = count;
    }
}
