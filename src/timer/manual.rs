//! Simulated time.
//!
//! `ManualScheduler::advance` moves a shared `ManualClock` forward and runs
//! every timer that comes due, in deadline order, on the calling thread.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{Clock, Scheduler, TimerCallback, TimerHandle};

// == Manual Clock ==
/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct Timers {
    next_id: u64,
    /// Keyed by (deadline, id) so equal deadlines fire in arming order
    queue: BTreeMap<(u64, u64), TimerCallback>,
    deadlines: HashMap<u64, u64>,
}

// == Manual Scheduler ==
/// Scheduler whose timers fire only inside `advance`.
pub struct ManualScheduler {
    clock: Arc<ManualClock>,
    timers: Mutex<Timers>,
}

impl ManualScheduler {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            timers: Mutex::new(Timers::default()),
        }
    }

    pub fn clock(&self) -> &Arc<ManualClock> {
        &self.clock
    }

    /// Number of armed timers.
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    // == Advance ==
    /// Moves time forward by `by`, firing due timers as their deadlines pass.
    ///
    /// Callbacks run without the scheduler lock held, so they may arm or
    /// cancel timers; newly armed timers that fall inside the window also fire.
    /// Returns how many callbacks ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.clock.now_ms().saturating_add(by.as_millis() as u64);
        let mut fired = 0;

        loop {
            let next = {
                let mut timers = self.lock();
                let due = timers
                    .queue
                    .keys()
                    .next()
                    .copied()
                    .filter(|(deadline, _)| *deadline <= target);
                due.and_then(|slot| {
                    timers.deadlines.remove(&slot.1);
                    timers.queue.remove(&slot).map(|cb| (slot.0, cb))
                })
            };

            let Some((deadline, callback)) = next else {
                break;
            };

            if deadline > self.clock.now_ms() {
                self.clock.set(deadline);
            }
            callback();
            fired += 1;
        }

        self.clock.set(target.max(self.clock.now_ms()));
        fired
    }

    fn lock(&self) -> MutexGuard<'_, Timers> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let deadline = self.clock.now_ms().saturating_add(delay.as_millis() as u64);
        let mut timers = self.lock();
        timers.next_id += 1;
        let id = timers.next_id;
        timers.queue.insert((deadline, id), callback);
        timers.deadlines.insert(id, deadline);
        TimerHandle::from_raw(id)
    }

    fn cancel(&self, handle: &TimerHandle) {
        let mut timers = self.lock();
        if let Some(deadline) = timers.deadlines.remove(&handle.id()) {
            timers.queue.remove(&(deadline, handle.id()));
        }
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now_ms", &self.clock.now_ms())
            .field("pending", &self.pending())
            .finish()
    }
}
