//! Sweeper Module
//!
//! Arms deferred removals so expired entries leave the backend without
//! waiting for a read.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tracing::debug;

use super::store::{lock_store, CacheStore};
use crate::timer::{Scheduler, TimerHandle};

// == Armed Timer ==
/// A pending sweep. `ticket` identifies this particular arming so a callback
/// that wakes after its key was re-armed can tell it is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedTimer {
    pub handle: TimerHandle,
    pub ticket: u64,
}

/// Outcome of `Sweeper::schedule`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Armed {
    /// The delay had already run out; the caller must remove the key now
    Fired,
    Pending(ArmedTimer),
}

// == Sweeper ==
pub struct Sweeper {
    scheduler: Arc<dyn Scheduler>,
    target: Weak<Mutex<CacheStore>>,
    next_ticket: AtomicU64,
}

impl Sweeper {
    pub fn new(scheduler: Arc<dyn Scheduler>, target: Weak<Mutex<CacheStore>>) -> Self {
        Self {
            scheduler,
            target,
            next_ticket: AtomicU64::new(1),
        }
    }

    // == Schedule ==
    /// Arms a removal of `key` after `delay_ms`.
    ///
    /// A non-positive delay returns `Armed::Fired` without touching the
    /// scheduler. When a pending timer fires it re-enters the store with a
    /// zero delay, which resolves to exactly one synchronous removal.
    pub fn schedule(&self, key: &str, delay_ms: i64) -> Armed {
        if delay_ms <= 0 {
            return Armed::Fired;
        }

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let target = self.target.clone();
        let owned_key = key.to_string();

        let handle = self.scheduler.schedule(
            Duration::from_millis(delay_ms as u64),
            Box::new(move || {
                if let Some(store) = target.upgrade() {
                    lock_store(&store).on_sweep_due(&owned_key, ticket);
                }
            }),
        );

        debug!(key, delay_ms, ticket, "Sweep armed");
        Armed::Pending(ArmedTimer { handle, ticket })
    }

    // == Cancel ==
    pub fn cancel(&self, timer: &ArmedTimer) {
        self.scheduler.cancel(&timer.handle);
        debug!(ticket = timer.ticket, "Sweep cancelled");
    }
}
