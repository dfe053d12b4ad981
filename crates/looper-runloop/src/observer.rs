//! RunLoop observer definitions.
//!
//! Observers are notified at specific phases of the RunLoop,
//! similar to CFRunLoopObserver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::phase::RunLoopPhase;
use crate::run_loop::{OwnerSlot, RunLoop};

/// RunLoop observer trait.
///
/// Implement this for reusable observers; plain closures can be wrapped
/// with [`Observer::new`].
pub trait RunLoopObserver: Send + Sync {
    /// Get the activity mask (which phases to observe).
    /// Use RunLoopPhase::ALL to observe all phases.
    fn activities(&self) -> u32;

    /// Whether the observer repeats (false = triggered once then removed).
    fn repeats(&self) -> bool {
        true
    }

    /// Called when an observed phase is announced.
    fn on_phase(&self, observer: &Observer, phase: RunLoopPhase);
}

struct FnObserver<F> {
    activities: u32,
    repeats: bool,
    callback: F,
}

impl<F> RunLoopObserver for FnObserver<F>
where
    F: Fn(&Observer, RunLoopPhase) + Send + Sync,
{
    fn activities(&self) -> u32 {
        self.activities
    }

    fn repeats(&self) -> bool {
        self.repeats
    }

    fn on_phase(&self, observer: &Observer, phase: RunLoopPhase) {
        (self.callback)(observer, phase);
    }
}

/// Observer registration handle.
///
/// Identity (for add/remove/contains) is the `Arc`, never the phase set or
/// the repeat flag.
pub struct Observer {
    id: String,
    activities: u32,
    repeats: bool,
    handler: Arc<dyn RunLoopObserver>,
    cancelled: AtomicBool,
    fired: AtomicBool,
    pub(crate) owner: OwnerSlot,
}

impl Observer {
    /// Create an observer from a closure.
    pub fn new<F>(activities: u32, repeats: bool, callback: F) -> Arc<Self>
    where
        F: Fn(&Observer, RunLoopPhase) + Send + Sync + 'static,
    {
        Self::from_handler(
            Uuid::new_v4().to_string(),
            Arc::new(FnObserver {
                activities,
                repeats,
                callback,
            }),
        )
    }

    /// Create a non-repeating observer for a single phase.
    pub fn once<F>(phase: RunLoopPhase, callback: F) -> Arc<Self>
    where
        F: Fn(&Observer, RunLoopPhase) + Send + Sync + 'static,
    {
        Self::new(phase as u32, false, callback)
    }

    /// Wrap a [`RunLoopObserver`] implementation.
    pub fn from_handler(id: impl Into<String>, handler: Arc<dyn RunLoopObserver>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            activities: handler.activities(),
            repeats: handler.repeats(),
            handler,
            cancelled: AtomicBool::new(false),
            fired: AtomicBool::new(false),
            owner: OwnerSlot::default(),
        })
    }

    /// Get the observer ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the activity mask.
    pub fn activities(&self) -> u32 {
        self.activities
    }

    /// Whether the observer repeats.
    pub fn repeats(&self) -> bool {
        self.repeats
    }

    /// Get the wrapped handler.
    pub fn handler(&self) -> &Arc<dyn RunLoopObserver> {
        &self.handler
    }

    /// Cancel the observer. The owning loop drops it on its next
    /// notification pass.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            debug!("Observer {} cancelled", self.id);
        }
    }

    /// Check if cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// The loop this observer is registered with, if any.
    pub fn run_loop(&self) -> Option<Arc<RunLoop>> {
        self.owner.get()
    }

    /// Check if this observer should be triggered for the given phase.
    pub fn should_trigger(&self, phase: RunLoopPhase) -> bool {
        if self.is_cancelled() || self.should_remove() {
            return false;
        }
        phase.matches(self.activities)
    }

    /// Mark as fired.
    pub(crate) fn mark_fired(&self) {
        self.fired.store(true, Ordering::SeqCst);
    }

    /// Check if should be removed (fired and non-repeating).
    pub fn should_remove(&self) -> bool {
        self.fired.load(Ordering::SeqCst) && !self.repeats
    }

    pub(crate) fn notify(&self, phase: RunLoopPhase) {
        self.handler.on_phase(self, phase);
    }
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("id", &self.id)
            .field("activities", &self.activities)
            .field("repeats", &self.repeats)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;
