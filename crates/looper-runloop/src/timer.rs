//! Timer - a time-triggered callback owned by a RunLoop.
//!
//! A timer carries an absolute fire time and an optional repeat interval.
//! Once added to a loop it is kept in the loop's ascending fire-time order;
//! changing the fire time of a registered timer re-inserts it into that
//! order and wakes the loop if its current wait deadline is affected.
//!
//! Fire times that would overflow `Instant` are clamped to a far-future
//! instant, so a huge delay or interval means "effectively never".

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::run_loop::{OwnerSlot, RunLoop};

type TimerCallback = Box<dyn Fn(&Timer) + Send + Sync>;

/// Stand-in offset for fire times past the end of `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// `base + delay`, clamped to a far-future instant on overflow.
pub(crate) fn deadline_after(base: Instant, delay: Duration) -> Instant {
    base.checked_add(delay)
        .or_else(|| base.checked_add(FAR_FUTURE))
        .unwrap_or(base)
}

/// A scheduled, possibly repeating, callback.
///
/// `interval == 0` means one-shot. A one-shot timer is invalidated when it
/// fires and is never fired again, even if the same handle is re-added.
pub struct Timer {
    /// Timer ID (logging only; identity is the `Arc`).
    id: String,

    /// Absolute time of the next firing.
    fire_time: Mutex<Instant>,

    /// Repeat interval, zero for one-shot timers.
    interval: Duration,

    /// Callback invoked on the owning loop's thread.
    callback: TimerCallback,

    /// Whether the timer has been cancelled (or a one-shot has fired).
    cancelled: AtomicBool,

    /// Fire count.
    fire_count: AtomicU64,

    /// Loop this timer is registered with.
    pub(crate) owner: OwnerSlot,
}

impl Timer {
    /// Create a timer firing at `fire_time`, repeating every `interval`
    /// unless the interval is zero.
    pub fn at<F>(fire_time: Instant, interval: Duration, callback: F) -> Arc<Self>
    where
        F: Fn(&Timer) + Send + Sync + 'static,
    {
        Self::build(Uuid::new_v4().to_string(), fire_time, interval, Box::new(callback))
    }

    /// Create a one-shot timer firing once after `delay`.
    pub fn once<F>(delay: Duration, callback: F) -> Arc<Self>
    where
        F: Fn(&Timer) + Send + Sync + 'static,
    {
        Self::at(deadline_after(Instant::now(), delay), Duration::ZERO, callback)
    }

    /// Create a repeating timer. The first firing is one interval from now.
    pub fn repeating<F>(interval: Duration, callback: F) -> Arc<Self>
    where
        F: Fn(&Timer) + Send + Sync + 'static,
    {
        Self::at(deadline_after(Instant::now(), interval), interval, callback)
    }

    fn build(id: String, fire_time: Instant, interval: Duration, callback: TimerCallback) -> Arc<Self> {
        Arc::new(Self {
            id,
            fire_time: Mutex::new(fire_time),
            interval,
            callback,
            cancelled: AtomicBool::new(false),
            fire_count: AtomicU64::new(0),
            owner: OwnerSlot::default(),
        })
    }

    /// Get the timer ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the repeat interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check if the timer repeats.
    pub fn repeats(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Check if the timer has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Check if the timer is valid (not cancelled).
    pub fn is_valid(&self) -> bool {
        !self.is_cancelled()
    }

    /// Get the fire count.
    pub fn fire_count(&self) -> u64 {
        self.fire_count.load(Ordering::Relaxed)
    }

    /// Cancel the timer. The owning loop drops it on its next timer scan.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            debug!("Timer {} cancelled", self.id);
        }
    }

    /// The loop this timer is registered with, if any.
    pub fn run_loop(&self) -> Option<Arc<RunLoop>> {
        self.owner.get()
    }

    /// Absolute time of the next firing.
    pub fn next_fire_time(&self) -> Instant {
        *self.fire_time.lock()
    }

    /// Set the absolute time of the next firing.
    ///
    /// For a registered timer the write happens under the owning loop's
    /// list lock, so the loop never sees the order change under it.
    pub fn set_next_fire_time(&self, when: Instant) {
        if let Some(run_loop) = self.owner.get() {
            run_loop.reschedule_timer(self, when);
            return;
        }
        self.store_fire_time(when);
        // Added to a loop while we were writing: let it re-sort.
        if let Some(run_loop) = self.owner.get() {
            run_loop.reschedule_timer(self, when);
        }
    }

    /// Time remaining until the next firing (zero if already due).
    pub fn next_fire_in(&self) -> Duration {
        self.next_fire_time().saturating_duration_since(Instant::now())
    }

    /// Set the next firing relative to now.
    pub fn set_next_fire_in(&self, delay: Duration) {
        self.set_next_fire_time(deadline_after(Instant::now(), delay));
    }

    pub(crate) fn store_fire_time(&self, when: Instant) {
        *self.fire_time.lock() = when;
    }

    pub(crate) fn fire(&self) {
        self.fire_count.fetch_add(1, Ordering::Relaxed);
        (self.callback)(self);
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("id", &self.id)
            .field("interval", &self.interval)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Timer builder for convenient timer creation.
pub struct TimerBuilder {
    id: Option<String>,
    fire_time: Option<Instant>,
    delay: Duration,
    interval: Duration,
}

impl TimerBuilder {
    /// Create a new timer builder (one-shot, firing immediately).
    pub fn new() -> Self {
        Self {
            id: None,
            fire_time: None,
            delay: Duration::ZERO,
            interval: Duration::ZERO,
        }
    }

    /// Set the timer ID.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Fire after `delay` from the moment `build` is called.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self.fire_time = None;
        self
    }

    /// Fire at an absolute time.
    pub fn fire_at(mut self, when: Instant) -> Self {
        self.fire_time = Some(when);
        self
    }

    /// Repeat every `interval` (zero keeps it one-shot).
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Build the timer.
    pub fn build<F>(self, callback: F) -> Arc<Timer>
    where
        F: Fn(&Timer) + Send + Sync + 'static,
    {
        let id = self.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let fire_time = self
            .fire_time
            .unwrap_or_else(|| deadline_after(Instant::now(), self.delay));
        Timer::build(id, fire_time, self.interval, Box::new(callback))
    }
}

impl Default for TimerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
