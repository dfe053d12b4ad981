//! RunLoop phase and exit-reason definitions.
//!
//! Phases mirror the activities of a CFRunLoop: observers subscribe to a
//! bitmask of them and are notified as the dispatch cycle moves through
//! each one.

use serde::{Deserialize, Serialize};

/// RunLoop execution phase.
///
/// Corresponds to CFRunLoopActivity. The discriminants are bit values so a
/// set of phases can be carried as a plain `u32` mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum RunLoopPhase {
    /// Entering a dispatch iteration.
    Entry = 1 << 0,

    /// About to fire due timers.
    BeforeTimers = 1 << 1,

    /// About to fire signaled event sources.
    BeforeSources = 1 << 2,

    /// About to block in the wait primitive.
    BeforeWaiting = 1 << 5,

    /// Just returned from the wait primitive.
    AfterWaiting = 1 << 6,

    /// Leaving the dispatch pass.
    Exit = 1 << 7,
}

impl RunLoopPhase {
    /// All phases as a bitmask.
    pub const ALL: u32 = Self::Entry as u32
        | Self::BeforeTimers as u32
        | Self::BeforeSources as u32
        | Self::BeforeWaiting as u32
        | Self::AfterWaiting as u32
        | Self::Exit as u32;

    /// Check if this phase is included in the given activity mask.
    pub fn matches(&self, activities: u32) -> bool {
        (activities & (*self as u32)) != 0
    }

    /// Build a mask from a list of phases.
    pub fn mask(phases: &[RunLoopPhase]) -> u32 {
        phases.iter().fold(0, |acc, p| acc | *p as u32)
    }
}

impl std::fmt::Display for RunLoopPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunLoopPhase::Entry => write!(f, "entry"),
            RunLoopPhase::BeforeTimers => write!(f, "before_timers"),
            RunLoopPhase::BeforeSources => write!(f, "before_sources"),
            RunLoopPhase::BeforeWaiting => write!(f, "before_waiting"),
            RunLoopPhase::AfterWaiting => write!(f, "after_waiting"),
            RunLoopPhase::Exit => write!(f, "exit"),
        }
    }
}

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunLoopRunResult {
    /// Every timer and source the pass started with has been consumed.
    Finished,
    /// The loop was stopped.
    Stopped,
    /// The pass deadline elapsed.
    TimedOut,
    /// A source fired and the caller asked to return after one.
    HandledSource,
}

impl std::fmt::Display for RunLoopRunResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunLoopRunResult::Finished => write!(f, "finished"),
            RunLoopRunResult::Stopped => write!(f, "stopped"),
            RunLoopRunResult::TimedOut => write!(f, "timed_out"),
            RunLoopRunResult::HandledSource => write!(f, "handled_source"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_matches() {
        let activities = RunLoopPhase::Entry as u32 | RunLoopPhase::Exit as u32;
        assert!(RunLoopPhase::Entry.matches(activities));
        assert!(RunLoopPhase::Exit.matches(activities));
        assert!(!RunLoopPhase::BeforeWaiting.matches(activities));
    }

    #[test]
    fn test_phase_all() {
        assert!(RunLoopPhase::Entry.matches(RunLoopPhase::ALL));
        assert!(RunLoopPhase::BeforeTimers.matches(RunLoopPhase::ALL));
        assert!(RunLoopPhase::BeforeSources.matches(RunLoopPhase::ALL));
        assert!(RunLoopPhase::BeforeWaiting.matches(RunLoopPhase::ALL));
        assert!(RunLoopPhase::AfterWaiting.matches(RunLoopPhase::ALL));
        assert!(RunLoopPhase::Exit.matches(RunLoopPhase::ALL));
    }

    #[test]
    fn test_phase_mask() {
        let mask = RunLoopPhase::mask(&[RunLoopPhase::BeforeTimers, RunLoopPhase::AfterWaiting]);
        assert_eq!(mask, (1 << 1) | (1 << 6));
        assert_eq!(RunLoopPhase::mask(&[]), 0);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(RunLoopPhase::BeforeWaiting.to_string(), "before_waiting");
        assert_eq!(RunLoopPhase::Exit.to_string(), "exit");
    }

    #[test]
    fn test_run_result_display() {
        assert_eq!(RunLoopRunResult::HandledSource.to_string(), "handled_source");
        assert_eq!(RunLoopRunResult::TimedOut.to_string(), "timed_out");
    }
}
