//! Wall-clock time and tokio-backed timers.
//!
//! Each armed timer is its own spawned task that sleeps and then runs its
//! callback. Cancelling aborts the task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::debug;

use super::{Clock, Scheduler, TimerCallback, TimerHandle};
use crate::error::{CacheError, Result};

// == System Clock ==
/// Clock reading the system's wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        Utc::now().timestamp_millis().max(0) as u64
    }
}

type Pending = HashMap<u64, AbortHandle>;

// == Tokio Scheduler ==
/// Scheduler running each timer as a task on a tokio runtime.
#[derive(Debug)]
pub struct TokioScheduler {
    runtime: Handle,
    next_id: AtomicU64,
    pending: Arc<Mutex<Pending>>,
}

impl TokioScheduler {
    /// Creates a scheduler that spawns onto `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            next_id: AtomicU64::new(1),
            pending: Arc::new(Mutex::new(Pending::new())),
        }
    }

    /// Creates a scheduler bound to the runtime the caller is running on.
    ///
    /// # Errors
    /// Returns `CacheError::Internal` when called outside a tokio runtime.
    pub fn from_current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| CacheError::Internal(format!("no tokio runtime for timers: {}", e)))
    }

    /// Number of timers armed and not yet fired or cancelled.
    pub fn pending(&self) -> usize {
        lock(&self.pending).len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let pending = Arc::clone(&self.pending);

        // Held across the spawn so the task cannot finish before it is registered
        let mut guard = lock(&self.pending);
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            lock(&pending).remove(&id);
            callback();
        });
        guard.insert(id, task.abort_handle());

        debug!(timer = id, delay_ms = delay.as_millis() as u64, "Timer armed");
        TimerHandle::from_raw(id)
    }

    fn cancel(&self, handle: &TimerHandle) {
        if let Some(task) = lock(&self.pending).remove(&handle.id()) {
            task.abort();
            debug!(timer = handle.id(), "Timer cancelled");
        }
    }
}

fn lock(pending: &Mutex<Pending>) -> MutexGuard<'_, Pending> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_system_clock_is_current() {
        let now = SystemClock.now_ms();
        let reference = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        assert!(now.abs_diff(reference) < 1_000);
    }

    #[test]
    fn test_from_current_outside_runtime() {
        assert!(matches!(
            TokioScheduler::from_current(),
            Err(CacheError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn test_timer_fires_after_delay() {
        let scheduler = TokioScheduler::from_current().unwrap();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);

        scheduler.schedule(
            Duration::from_millis(50),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_timer_never_fires() {
        let scheduler = TokioScheduler::from_current().unwrap();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);

        let handle = scheduler.schedule(
            Duration::from_millis(50),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        scheduler.cancel(&handle);

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending(), 0);

        // Cancelling again is harmless
        scheduler.cancel(&handle);
    }
}
