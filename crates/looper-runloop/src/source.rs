//! EventSource - a signal-triggered callback.
//!
//! Similar to a version-0 CFRunLoopSource: `signal()` latches a flag and
//! wakes the owning loop; the loop consumes the flag with an atomic
//! test-and-clear, so each signal is delivered at most once no matter how
//! many threads race on it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::run_loop::{OwnerSlot, RunLoop};

type SourceCallback = Box<dyn Fn(&EventSource) + Send + Sync>;

/// A level-latched, signalable callback.
pub struct EventSource {
    id: String,
    signaled: AtomicBool,
    cancelled: AtomicBool,
    callback: SourceCallback,
    fire_count: AtomicU64,
    pub(crate) owner: OwnerSlot,
}

impl EventSource {
    /// Create a new event source.
    pub fn new<F>(callback: F) -> Arc<Self>
    where
        F: Fn(&EventSource) + Send + Sync + 'static,
    {
        Self::with_id(Uuid::new_v4().to_string(), callback)
    }

    /// Create a new event source with an explicit ID.
    pub fn with_id<F>(id: impl Into<String>, callback: F) -> Arc<Self>
    where
        F: Fn(&EventSource) + Send + Sync + 'static,
    {
        Arc::new(Self {
            id: id.into(),
            signaled: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            callback: Box::new(callback),
            fire_count: AtomicU64::new(0),
            owner: OwnerSlot::default(),
        })
    }

    /// Get the source ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Mark the source as signaled and wake its loop.
    ///
    /// Signaling again before the loop consumes the signal has no further
    /// effect.
    pub fn signal(&self) {
        self.signaled.store(true, Ordering::SeqCst);
        if let Some(run_loop) = self.owner.get() {
            run_loop.wake_up();
        }
    }

    /// Check if a signal is pending.
    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::SeqCst)
    }

    /// Cancel the source. The owning loop drops it on its next source scan.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            debug!("EventSource {} cancelled", self.id);
        }
    }

    /// Check if cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Get the fire count.
    pub fn fire_count(&self) -> u64 {
        self.fire_count.load(Ordering::Relaxed)
    }

    /// The loop this source is registered with, if any.
    pub fn run_loop(&self) -> Option<Arc<RunLoop>> {
        self.owner.get()
    }

    /// Consume a pending signal. Returns `true` for exactly one caller per
    /// signal.
    pub(crate) fn take_signal(&self) -> bool {
        self.signaled.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn fire(&self) {
        self.fire_count.fetch_add(1, Ordering::Relaxed);
        (self.callback)(self);
    }
}

impl std::fmt::Debug for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSource")
            .field("id", &self.id)
            .field("signaled", &self.is_signaled())
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
