//! Timer Module
//!
//! Clock and one-shot scheduling abstractions used by the sweeper.
//!
//! # Implementations
//! - `SystemClock` / `TokioScheduler`: wall-clock time and tokio tasks
//! - `ManualClock` / `ManualScheduler`: simulated time, advanced explicitly

mod manual;
mod runtime;

use std::time::Duration;

pub use manual::{ManualClock, ManualScheduler};
pub use runtime::{SystemClock, TokioScheduler};

/// Deferred work run once when a timer fires.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

// == Timer Handle ==
/// Opaque, cancellable reference to an armed one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Wraps a scheduler-assigned timer id.
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

// == Clock ==
/// Source of "now" as Unix milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

// == Scheduler ==
/// Arms one-shot callbacks.
pub trait Scheduler: Send + Sync {
    /// Runs `callback` once after `delay`. The callback must never be invoked
    /// from inside this call.
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// Disarms a pending timer. A no-op for fired or already-cancelled handles.
    fn cancel(&self, handle: &TimerHandle);
}
