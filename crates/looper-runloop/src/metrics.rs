//! RunLoop metrics collection.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// RunLoop metrics.
#[derive(Debug, Default)]
pub struct RunLoopMetrics {
    /// Whether recording is disabled.
    disabled: AtomicBool,

    /// Total dispatch passes (`run_for` calls that did work).
    pub passes: AtomicU64,

    /// Total dispatch iterations (Entry announcements).
    pub iterations: AtomicU64,

    /// Total timer firings.
    pub timers_fired: AtomicU64,

    /// Total event source firings.
    pub sources_fired: AtomicU64,

    /// Total observer notifications.
    pub observer_notifications: AtomicU64,

    /// Number of wake requests (wake_up, stop, signal).
    pub wake_requests: AtomicU64,

    /// Number of waits ended by a wake request rather than a deadline.
    pub wakeups: AtomicU64,

    /// Number of waits.
    pub waits: AtomicU64,

    /// Total time spent waiting (microseconds).
    pub wait_time_us: AtomicU64,

    /// Start time.
    start_time: parking_lot::RwLock<Option<Instant>>,
}

impl RunLoopMetrics {
    /// Create new metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create metrics that record nothing when `enabled` is false.
    pub fn with_enabled(enabled: bool) -> Self {
        let metrics = Self::default();
        metrics.disabled.store(!enabled, Ordering::Relaxed);
        metrics
    }

    /// Whether recording is enabled.
    pub fn is_enabled(&self) -> bool {
        !self.disabled.load(Ordering::Relaxed)
    }

    fn add(&self, counter: &AtomicU64, n: u64) {
        if self.is_enabled() {
            counter.fetch_add(n, Ordering::Relaxed);
        }
    }

    /// Mark the start of a dispatch pass; the first call sets the uptime origin.
    pub fn record_pass(&self) {
        if !self.is_enabled() {
            return;
        }
        self.passes.fetch_add(1, Ordering::Relaxed);
        let mut start = self.start_time.write();
        if start.is_none() {
            *start = Some(Instant::now());
        }
    }

    /// Get uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time
            .read()
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    /// Record a loop iteration.
    pub fn record_iteration(&self) {
        self.add(&self.iterations, 1);
    }

    /// Record a timer firing.
    pub fn record_timer_fired(&self) {
        self.add(&self.timers_fired, 1);
    }

    /// Record an event source firing.
    pub fn record_source_fired(&self) {
        self.add(&self.sources_fired, 1);
    }

    /// Record observer notification.
    pub fn record_observer_notification(&self) {
        self.add(&self.observer_notifications, 1);
    }

    /// Record a wake request.
    pub fn record_wake_request(&self) {
        self.add(&self.wake_requests, 1);
    }

    /// Record a finished wait and whether a wake request ended it.
    pub fn record_wait(&self, waited: Duration, woken: bool) {
        self.add(&self.waits, 1);
        self.add(&self.wait_time_us, waited.as_micros() as u64);
        if woken {
            self.add(&self.wakeups, 1);
        }
    }

    /// Get a snapshot of the metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            uptime_secs: self.uptime_secs(),
            passes: self.passes.load(Ordering::Relaxed),
            iterations: self.iterations.load(Ordering::Relaxed),
            timers_fired: self.timers_fired.load(Ordering::Relaxed),
            sources_fired: self.sources_fired.load(Ordering::Relaxed),
            observer_notifications: self.observer_notifications.load(Ordering::Relaxed),
            wake_requests: self.wake_requests.load(Ordering::Relaxed),
            wakeups: self.wakeups.load(Ordering::Relaxed),
            waits: self.waits.load(Ordering::Relaxed),
            wait_time_us: self.wait_time_us.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: u64,
    pub passes: u64,
    pub iterations: u64,
    pub timers_fired: u64,
    pub sources_fired: u64,
    pub observer_notifications: u64,
    pub wake_requests: u64,
    pub wakeups: u64,
    pub waits: u64,
    pub wait_time_us: u64,
}

impl MetricsSnapshot {
    /// Calculate average wait time in milliseconds.
    pub fn avg_wait_time_ms(&self) -> f64 {
        if self.waits == 0 {
            return 0.0;
        }
        (self.wait_time_us as f64 / self.waits as f64) / 1000.0
    }

    /// Calculate callbacks (timers + sources) per second of uptime.
    pub fn callbacks_per_second(&self) -> f64 {
        if self.uptime_secs == 0 {
            return 0.0;
        }
        (self.timers_fired + self.sources_fired) as f64 / self.uptime_secs as f64
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
