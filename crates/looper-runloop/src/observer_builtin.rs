//! Built-in observer implementations for RunLoop.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::observer::{Observer, RunLoopObserver};
use crate::phase::RunLoopPhase;

/// Logging observer for debugging.
///
/// Logs all phase transitions.
pub struct LoggingObserver {
    name: String,
}

impl LoggingObserver {
    /// Create a new logging observer.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl RunLoopObserver for LoggingObserver {
    fn activities(&self) -> u32 {
        RunLoopPhase::ALL
    }

    fn on_phase(&self, observer: &Observer, phase: RunLoopPhase) {
        debug!(observer = %observer.id(), "[{}] RunLoop phase: {}", self.name, phase);
    }
}

const PHASES: [RunLoopPhase; 6] = [
    RunLoopPhase::Entry,
    RunLoopPhase::BeforeTimers,
    RunLoopPhase::BeforeSources,
    RunLoopPhase::BeforeWaiting,
    RunLoopPhase::AfterWaiting,
    RunLoopPhase::Exit,
];

/// Phase-count observer.
///
/// Counts how many times each observed phase was announced.
pub struct MetricsObserver {
    activities: u32,
    counts: [AtomicU64; 6],
}

impl MetricsObserver {
    /// Create a new metrics observer watching every phase.
    pub fn new() -> Self {
        Self::with_activities(RunLoopPhase::ALL)
    }

    /// Create with custom activities.
    pub fn with_activities(activities: u32) -> Self {
        Self {
            activities,
            counts: Default::default(),
        }
    }

    /// Number of announcements seen for `phase`.
    pub fn count(&self, phase: RunLoopPhase) -> u64 {
        self.counts[Self::slot(phase)].load(Ordering::Relaxed)
    }

    /// Counts for every phase, in announcement order.
    pub fn counts(&self) -> Vec<(RunLoopPhase, u64)> {
        PHASES.iter().map(|p| (*p, self.count(*p))).collect()
    }

    fn slot(phase: RunLoopPhase) -> usize {
        match phase {
            RunLoopPhase::Entry => 0,
            RunLoopPhase::BeforeTimers => 1,
            RunLoopPhase::BeforeSources => 2,
            RunLoopPhase::BeforeWaiting => 3,
            RunLoopPhase::AfterWaiting => 4,
            RunLoopPhase::Exit => 5,
        }
    }
}

impl Default for MetricsObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLoopObserver for MetricsObserver {
    fn activities(&self) -> u32 {
        self.activities
    }

    fn on_phase(&self, _observer: &Observer, phase: RunLoopPhase) {
        self.counts[Self::slot(phase)].fetch_add(1, Ordering::Relaxed);
    }
}
