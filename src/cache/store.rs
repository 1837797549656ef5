//! Cache Store Module
//!
//! Expiring cache over a persistent backend: the codec shapes what is stored,
//! the expiry index remembers what must be swept, and the sweeper removes it
//! on time. Reads also check expiry, so entries the sweeper missed never leak.

use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::codec;
use super::index::{ExpiryIndex, IndexEntry};
use super::stats::CacheStats;
use super::sweeper::{Armed, ArmedTimer, Sweeper};
use crate::error::Result;
use crate::storage::KvBackend;
use crate::timer::{Clock, Scheduler, SystemClock, TokioScheduler};

// == Cache Store ==
/// The cache state. Reached through a `Cache` handle, which serializes every
/// operation and every sweep behind one lock.
pub struct CacheStore {
    backend: Arc<dyn KvBackend>,
    clock: Arc<dyn Clock>,
    index: ExpiryIndex,
    sweeper: Sweeper,
    stats: CacheStats,
}

impl CacheStore {
    // == Set ==
    /// Stores `data` under `key`, expiring after `ttl_ms` (0 = never).
    ///
    /// A negative TTL is coerced to 0 with a warning. A payload that cannot
    /// be serialized is stored in its debug form and never expires.
    ///
    /// # Errors
    /// - `CacheError::InvalidPayload` if `data` is `None`; nothing is written
    /// - `CacheError::Storage` if the backend rejects the entry
    pub fn set_cache<T>(&mut self, key: &str, data: Option<&T>, ttl_ms: i64) -> Result<()>
    where
        T: Serialize + Debug + ?Sized,
    {
        let ttl = normalize_ttl(key, ttl_ms);
        let encoded = codec::encode(data, ttl, self.clock.now_ms())?;

        self.backend.set_item(key, &encoded.raw)?;

        let tracked_ttl = if encoded.is_structured() { ttl } else { 0 };
        self.put_expiry(key, tracked_ttl);
        Ok(())
    }

    // == Get ==
    /// Returns the payload for `key`, or `None` if absent or expired.
    ///
    /// An expired entry is deleted on the spot. Values not written by this
    /// cache are returned as-is.
    pub fn get_cache(&mut self, key: &str) -> Option<Value> {
        let raw = match self.backend.get_item(key) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Read failed, treating as absent");
                self.stats.record_miss();
                return None;
            }
        };

        let Some(entry) = codec::decode(raw.as_deref()) else {
            self.stats.record_miss();
            return None;
        };

        if entry.is_live(self.clock.now_ms()) {
            self.stats.record_hit();
            return Some(entry.into_payload());
        }

        debug!(key, "Entry expired on read");
        self.remove_item(key);
        self.remove_expiry(key);
        self.stats.record_lazy_expiration();
        self.stats.record_miss();
        None
    }

    // == Remove ==
    /// Deletes `key` and forgets any pending sweep for it.
    pub fn remove_cache(&mut self, key: &str) {
        self.remove_item(key);
        self.remove_expiry(key);
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_tracked_entries(self.index.len());
        stats
    }

    /// Whether a sweep is pending for `key`.
    pub fn is_tracked(&self, key: &str) -> bool {
        self.index.has(key)
    }

    /// Index metadata for `key`, if tracked.
    pub fn expiry_entry(&self, key: &str) -> Option<&IndexEntry> {
        self.index.get(key)
    }

    // == Put Expiry ==
    /// Tracks `key` for a sweep `ttl_ms` from now, replacing any pending one.
    ///
    /// A zero TTL only cancels what was pending. The reserved index key is
    /// never tracked.
    pub fn put_expiry(&mut self, key: &str, ttl_ms: u64) {
        if self.index.is_reserved(key) {
            return;
        }

        let replaced = self.index.remove(key);
        if let Some(timer) = replaced.as_ref().and_then(|entry| entry.timer) {
            self.sweeper.cancel(&timer);
        }

        if ttl_ms == 0 {
            if replaced.is_some() {
                self.persist_index();
            }
            return;
        }

        let mut entry = IndexEntry::new(key, ttl_ms, self.clock.now_ms());
        entry.timer = self.arm(key, i64::try_from(ttl_ms).unwrap_or(i64::MAX));
        if entry.timer.is_some() {
            self.index.insert(entry);
            self.persist_index();
        }
    }

    // == Remove Expiry ==
    /// Stops tracking `key`. The stored entry itself is left alone.
    pub fn remove_expiry(&mut self, key: &str) {
        if let Some(entry) = self.index.remove(key) {
            if let Some(timer) = entry.timer {
                self.sweeper.cancel(&timer);
            }
            self.persist_index();
        }
    }

    // == Replay ==
    /// Re-arms a sweep for every loaded index entry. Entries whose deadline
    /// passed while the process was down are removed immediately.
    fn replay(&mut self) {
        let now = self.clock.now_ms();
        let mut rearmed = 0usize;
        let mut swept = 0usize;

        for key in self.index.keys() {
            let Some(remaining) = self.index.get(&key).map(|e| e.remaining_ms(now)) else {
                continue;
            };

            match self.sweeper.schedule(&key, remaining) {
                Armed::Pending(timer) => {
                    if let Some(entry) = self.index.get_mut(&key) {
                        entry.timer = Some(timer);
                    }
                    rearmed += 1;
                }
                Armed::Fired => {
                    self.remove_item(&key);
                    self.index.remove(&key);
                    self.stats.record_sweep();
                    swept += 1;
                }
            }
        }

        self.persist_index();
        info!(rearmed, swept, "Expiry index replayed");
    }

    // == Sweep ==
    /// Timer entry point. Ignores firings for a key that has since been
    /// re-armed, removed, or made permanent.
    pub(super) fn on_sweep_due(&mut self, key: &str, ticket: u64) {
        let current = self
            .index
            .get(key)
            .and_then(|entry| entry.timer)
            .map(|timer| timer.ticket);

        if current != Some(ticket) {
            debug!(key, ticket, "Stale sweep ignored");
            return;
        }

        self.arm(key, 0);
    }

    /// Arms a sweep, or performs it at once when `delay_ms` has run out.
    fn arm(&mut self, key: &str, delay_ms: i64) -> Option<ArmedTimer> {
        match self.sweeper.schedule(key, delay_ms) {
            Armed::Pending(timer) => Some(timer),
            Armed::Fired => {
                self.sweep(key);
                None
            }
        }
    }

    fn sweep(&mut self, key: &str) {
        self.remove_item(key);
        self.index.remove(key);
        self.persist_index();
        self.stats.record_sweep();
        debug!(key, "Entry swept");
    }

    fn remove_item(&self, key: &str) {
        if let Err(e) = self.backend.remove_item(key) {
            warn!(key, error = %e, "Failed to remove entry from storage");
        }
    }

    fn persist_index(&self) {
        if let Err(e) = self.index.persist(self.backend.as_ref()) {
            warn!(error = %e, "Failed to persist expiry index");
        }
    }
}

impl Drop for CacheStore {
    fn drop(&mut self) {
        for key in self.index.keys() {
            if let Some(timer) = self.index.get(&key).and_then(|entry| entry.timer) {
                self.sweeper.cancel(&timer);
            }
        }
    }
}

/// Coerces a negative TTL to "never expires".
fn normalize_ttl(key: &str, ttl_ms: i64) -> u64 {
    u64::try_from(ttl_ms).unwrap_or_else(|_| {
        warn!(key, ttl_ms, "TTL must be a non-negative number of milliseconds, using 0");
        0
    })
}

pub(super) fn lock_store(store: &Mutex<CacheStore>) -> MutexGuard<'_, CacheStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

// == Cache Handle ==
/// Shareable handle to one cache instance.
///
/// Clones refer to the same store. Operations never interleave with each
/// other or with sweeps.
#[derive(Clone)]
pub struct Cache {
    inner: Arc<Mutex<CacheStore>>,
}

impl Cache {
    // == Open ==
    /// Loads the expiry index from `backend` and re-arms its sweeps.
    ///
    /// # Arguments
    /// * `backend` - Persistent key-value store holding entries and the index
    /// * `scheduler` - Source of one-shot timers for sweeps
    /// * `clock` - Source of the current time
    /// * `index_key` - Reserved key the expiry index is stored under
    pub fn open(
        backend: Arc<dyn KvBackend>,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
        index_key: impl Into<String>,
    ) -> Self {
        let index = ExpiryIndex::load(backend.as_ref(), index_key);
        let inner = Arc::new_cyclic(|weak| {
            Mutex::new(CacheStore {
                backend,
                clock,
                index,
                sweeper: Sweeper::new(scheduler, weak.clone()),
                stats: CacheStats::new(),
            })
        });

        lock_store(&inner).replay();
        Self { inner }
    }

    /// Opens with wall-clock time and tokio timers on the current runtime.
    ///
    /// # Errors
    /// `CacheError::Internal` when called outside a tokio runtime.
    pub fn with_tokio(backend: Arc<dyn KvBackend>, index_key: impl Into<String>) -> Result<Self> {
        let scheduler = TokioScheduler::from_current()?;
        Ok(Self::open(
            backend,
            Arc::new(scheduler),
            Arc::new(SystemClock),
            index_key,
        ))
    }

    /// See [`CacheStore::set_cache`].
    pub fn set_cache<T>(&self, key: &str, data: Option<&T>, ttl_ms: i64) -> Result<()>
    where
        T: Serialize + Debug + ?Sized,
    {
        self.lock().set_cache(key, data, ttl_ms)
    }

    /// See [`CacheStore::get_cache`].
    pub fn get_cache(&self, key: &str) -> Option<Value> {
        self.lock().get_cache(key)
    }

    /// See [`CacheStore::remove_cache`].
    pub fn remove_cache(&self, key: &str) {
        self.lock().remove_cache(key)
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats()
    }

    pub fn is_tracked(&self, key: &str) -> bool {
        self.lock().is_tracked(key)
    }

    /// Index metadata for `key`, if tracked.
    pub fn expiry_entry(&self, key: &str) -> Option<IndexEntry> {
        self.lock().expiry_entry(key).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, CacheStore> {
        lock_store(&self.inner)
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache").finish_non_exhaustive()
    }
}
