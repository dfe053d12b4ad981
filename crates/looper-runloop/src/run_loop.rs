//! RunLoop core: state, registration API and thread ownership.
//!
//! The RunLoop is the per-thread event loop. It owns three collections
//! (timers, observers, event sources) behind one reentrant list lock, and a
//! separate wake signal used to interrupt its blocking wait.
//!
//! The list lock is held for the whole of a dispatch pass, including while
//! user callbacks run. It is reentrant so that those callbacks can add,
//! remove and query entities on the same loop. The cost is that another
//! thread mutating the loop blocks until the owning thread reaches its
//! wait step; the owning thread itself never blocks while holding it.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use std::time::Instant;

use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::RunLoopConfig;
use crate::error::{RunLoopError, RunLoopResult};
use crate::metrics::RunLoopMetrics;
use crate::observer::Observer;
use crate::run_loop_wakeup::WakeSignal;
use crate::source::EventSource;
use crate::timer::Timer;

/// Back-reference from an entity to the loop that owns it.
#[derive(Default)]
pub(crate) struct OwnerSlot(Mutex<Option<Weak<RunLoop>>>);

impl OwnerSlot {
    pub(crate) fn get(&self) -> Option<Arc<RunLoop>> {
        self.0.lock().as_ref().and_then(Weak::upgrade)
    }

    /// Claim the entity for `run_loop`. Fails if another live loop owns it.
    fn claim(&self, run_loop: &Weak<RunLoop>) -> bool {
        let mut slot = self.0.lock();
        if let Some(current) = slot.as_ref() {
            if !current.ptr_eq(run_loop) && current.strong_count() > 0 {
                return false;
            }
        }
        *slot = Some(run_loop.clone());
        true
    }

    fn release(&self, run_loop: &RunLoop) {
        let mut slot = self.0.lock();
        if slot
            .as_ref()
            .is_some_and(|current| std::ptr::eq(current.as_ptr(), run_loop))
        {
            *slot = None;
        }
    }
}

/// Collections guarded by the list lock.
#[derive(Default)]
pub(crate) struct LoopLists {
    /// Ascending by next fire time; equal fire times keep insertion order.
    pub(crate) timers: Vec<Arc<Timer>>,

    pub(crate) observers: Vec<Arc<Observer>>,

    pub(crate) sources: Vec<Arc<EventSource>>,

    /// Union of the registered, non-cancelled observers' activities.
    pub(crate) observer_mask: u32,

    /// Timer whose fire time is the current wait deadline.
    pub(crate) waiting_until_timer: Option<Weak<Timer>>,

    /// Deadline of the current wait; `None` while waiting means forever.
    pub(crate) wait_deadline: Option<Instant>,
}

impl LoopLists {
    pub(crate) fn has_work(&self) -> bool {
        !self.timers.is_empty() || !self.sources.is_empty()
    }

    fn insert_timer(&mut self, timer: Arc<Timer>) {
        let fire_time = timer.next_fire_time();
        let pos = self
            .timers
            .partition_point(|t| t.next_fire_time() <= fire_time);
        self.timers.insert(pos, timer);
    }

    fn is_keyed_on(&self, timer: &Timer) -> bool {
        self.waiting_until_timer
            .as_ref()
            .is_some_and(|w| std::ptr::eq(w.as_ptr(), timer))
    }

    fn recompute_observer_mask(&mut self) {
        self.observer_mask = self
            .observers
            .iter()
            .filter(|o| !o.is_cancelled())
            .fold(0, |mask, o| mask | o.activities());
    }
}

/// The per-thread run loop.
///
/// Obtain the calling thread's loop with [`RunLoop::current`], or create a
/// standalone one bound to the calling thread with [`RunLoop::new`]. Every
/// method except `run`/`run_for` may be called from any thread.
pub struct RunLoop {
    /// Name used in log output.
    pub(crate) name: String,

    /// Thread allowed to run this loop.
    pub(crate) owner: ThreadId,

    /// Timers, observers and sources.
    pub(crate) lists: ReentrantMutex<RefCell<LoopLists>>,

    /// True while the owning thread is blocked in the wait step.
    pub(crate) waiting: AtomicBool,

    /// Set by `stop`, consumed at the start of a pass or after a wait.
    pub(crate) stop_requested: AtomicBool,

    /// Wake-up generation counter and condition variable.
    pub(crate) wake: WakeSignal,

    /// Configuration.
    pub(crate) config: RunLoopConfig,

    /// Metrics.
    pub(crate) metrics: Arc<RunLoopMetrics>,

    /// Handle to ourselves, stored in entities we own.
    self_ref: Weak<RunLoop>,
}

impl RunLoop {
    /// Create a new RunLoop owned by the calling thread.
    ///
    /// The loop is not registered as the thread's current loop; use
    /// [`RunLoop::current`] for that.
    pub fn new(config: RunLoopConfig) -> Arc<Self> {
        let name = config.resolved_name();
        let metrics = Arc::new(RunLoopMetrics::with_enabled(config.metrics_enabled));
        let run_loop = Arc::new_cyclic(|self_ref| Self {
            name,
            owner: thread::current().id(),
            lists: ReentrantMutex::new(RefCell::new(LoopLists::default())),
            waiting: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            wake: WakeSignal::new(),
            config,
            metrics,
            self_ref: self_ref.clone(),
        });
        debug!(run_loop = %run_loop.name, "RunLoop created");
        run_loop
    }

    /// The calling thread's RunLoop, created on first use.
    pub fn current() -> Arc<Self> {
        crate::registry::current()
    }

    /// Run `f` with exclusive access to the lists.
    ///
    /// `f` must not call back into user code.
    pub(crate) fn with_lists<R>(&self, f: impl FnOnce(&mut LoopLists) -> R) -> R {
        let guard = self.lists.lock();
        let mut lists = guard.borrow_mut();
        f(&mut lists)
    }

    // ========================================================================
    // Timers
    // ========================================================================

    /// Add a timer. Adding a timer that is already registered here is a
    /// no-op; adding a cancelled (or already fired one-shot) timer is ignored.
    pub fn add_timer(&self, timer: &Arc<Timer>) -> RunLoopResult<()> {
        if timer.is_cancelled() {
            debug!(run_loop = %self.name, timer = %timer.id(), "Ignoring cancelled timer");
            return Ok(());
        }

        let wake = self.with_lists(|lists| {
            if lists.timers.iter().any(|t| Arc::ptr_eq(t, timer)) {
                return Ok(false);
            }
            if !timer.owner.claim(&self.self_ref) {
                return Err(RunLoopError::AlreadyScheduled {
                    kind: "timer",
                    id: timer.id().to_string(),
                });
            }
            let fire_time = timer.next_fire_time();
            lists.insert_timer(timer.clone());
            debug!(run_loop = %self.name, timer = %timer.id(), "Timer added");

            // A waiting loop must recompute its deadline if this timer is
            // due before the one it is waiting for.
            Ok(self.is_waiting() && lists.wait_deadline.is_none_or(|d| fire_time < d))
        })?;

        if wake {
            self.wake_up();
        }
        Ok(())
    }

    /// Remove a timer. Removing an absent timer is a no-op.
    pub fn remove_timer(&self, timer: &Timer) {
        let wake = self.with_lists(|lists| {
            let before = lists.timers.len();
            lists.timers.retain(|t| !std::ptr::eq(Arc::as_ptr(t), timer));
            if lists.timers.len() != before {
                timer.owner.release(self);
                debug!(run_loop = %self.name, timer = %timer.id(), "Timer removed");
            }

            if !self.is_waiting() {
                return false;
            }
            if lists.is_keyed_on(timer) {
                lists.waiting_until_timer = None;
                return true;
            }
            !lists.has_work()
        });

        if wake {
            self.wake_up();
        }
    }

    /// Check whether `timer` is registered with this loop.
    pub fn contains_timer(&self, timer: &Timer) -> bool {
        self.with_lists(|lists| {
            lists
                .timers
                .iter()
                .any(|t| std::ptr::eq(Arc::as_ptr(t), timer))
        })
    }

    /// Number of registered timers.
    pub fn timer_count(&self) -> usize {
        self.with_lists(|lists| lists.timers.len())
    }

    /// Store a new fire time for `timer` and re-insert it in order.
    ///
    /// The write happens under the list lock so it cannot interleave with
    /// an insert or with the repeat advance of a firing pass.
    pub(crate) fn reschedule_timer(&self, timer: &Timer, when: Instant) {
        let wake = self.with_lists(|lists| {
            timer.store_fire_time(when);
            let Some(pos) = lists
                .timers
                .iter()
                .position(|t| std::ptr::eq(Arc::as_ptr(t), timer))
            else {
                return false;
            };
            let entry = lists.timers.remove(pos);
            lists.insert_timer(entry);

            if !self.is_waiting() {
                return false;
            }
            if lists.is_keyed_on(timer) {
                lists.waiting_until_timer = None;
                return true;
            }
            lists.wait_deadline.is_none_or(|d| when < d)
        });

        if wake {
            self.wake_up();
        }
    }

    // ========================================================================
    // Observers
    // ========================================================================

    /// Add an observer. Adding an observer that is already registered here
    /// is a no-op.
    pub fn add_observer(&self, observer: &Arc<Observer>) -> RunLoopResult<()> {
        if observer.is_cancelled() {
            debug!(run_loop = %self.name, observer = %observer.id(), "Ignoring cancelled observer");
            return Ok(());
        }

        self.with_lists(|lists| {
            if lists.observers.iter().any(|o| Arc::ptr_eq(o, observer)) {
                return Ok(());
            }
            if !observer.owner.claim(&self.self_ref) {
                return Err(RunLoopError::AlreadyScheduled {
                    kind: "observer",
                    id: observer.id().to_string(),
                });
            }
            lists.observers.push(observer.clone());
            lists.observer_mask |= observer.activities();
            debug!(run_loop = %self.name, observer = %observer.id(), "Observer added");
            Ok(())
        })
    }

    /// Remove an observer. Removing an absent observer is a no-op.
    pub fn remove_observer(&self, observer: &Observer) {
        self.with_lists(|lists| {
            let before = lists.observers.len();
            lists
                .observers
                .retain(|o| !std::ptr::eq(Arc::as_ptr(o), observer));
            if lists.observers.len() != before {
                observer.owner.release(self);
                lists.recompute_observer_mask();
                debug!(run_loop = %self.name, observer = %observer.id(), "Observer removed");
            }
        });
    }

    /// Check whether `observer` is registered with this loop.
    pub fn contains_observer(&self, observer: &Observer) -> bool {
        self.with_lists(|lists| {
            lists
                .observers
                .iter()
                .any(|o| std::ptr::eq(Arc::as_ptr(o), observer))
        })
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.with_lists(|lists| lists.observers.len())
    }

    // ========================================================================
    // Event sources
    // ========================================================================

    /// Add an event source. Adding a source that is already registered here
    /// is a no-op.
    pub fn add_event_source(&self, source: &Arc<EventSource>) -> RunLoopResult<()> {
        if source.is_cancelled() {
            debug!(run_loop = %self.name, source = %source.id(), "Ignoring cancelled source");
            return Ok(());
        }

        let wake = self.with_lists(|lists| {
            if lists.sources.iter().any(|s| Arc::ptr_eq(s, source)) {
                return Ok(false);
            }
            if !source.owner.claim(&self.self_ref) {
                return Err(RunLoopError::AlreadyScheduled {
                    kind: "event source",
                    id: source.id().to_string(),
                });
            }
            lists.sources.push(source.clone());
            debug!(run_loop = %self.name, source = %source.id(), "EventSource added");
            Ok(source.is_signaled() && self.is_waiting())
        })?;

        if wake {
            self.wake_up();
        }
        Ok(())
    }

    /// Remove an event source. Removing an absent source is a no-op.
    pub fn remove_event_source(&self, source: &EventSource) {
        let wake = self.with_lists(|lists| {
            let before = lists.sources.len();
            lists
                .sources
                .retain(|s| !std::ptr::eq(Arc::as_ptr(s), source));
            if lists.sources.len() != before {
                source.owner.release(self);
                debug!(run_loop = %self.name, source = %source.id(), "EventSource removed");
            }
            self.is_waiting() && !lists.has_work()
        });

        if wake {
            self.wake_up();
        }
    }

    /// Check whether `source` is registered with this loop.
    pub fn contains_event_source(&self, source: &EventSource) -> bool {
        self.with_lists(|lists| {
            lists
                .sources
                .iter()
                .any(|s| std::ptr::eq(Arc::as_ptr(s), source))
        })
    }

    /// Number of registered event sources.
    pub fn event_source_count(&self) -> usize {
        self.with_lists(|lists| lists.sources.len())
    }

    /// Run `f` once on this loop's thread, during its next source dispatch.
    ///
    /// Backed by a self-removing [`EventSource`] that is added and signaled
    /// immediately.
    pub fn perform<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let pending = Mutex::new(Some(f));
        let source = EventSource::with_id(format!("perform-{}", Uuid::new_v4()), move |source| {
            let f = pending.lock().take();
            if let Some(f) = f {
                f();
            }
            source.cancel();
            if let Some(run_loop) = source.run_loop() {
                run_loop.remove_event_source(source);
            }
        });

        if let Err(e) = self.add_event_source(&source) {
            warn!(run_loop = %self.name, "Failed to schedule perform: {}", e);
            return;
        }
        source.signal();
    }

    // ========================================================================
    // Control
    // ========================================================================

    /// Request the loop to stop.
    ///
    /// Takes effect no later than the next wait boundary. If the loop is not
    /// running, the request is kept until the next pass consumes it.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        debug!(run_loop = %self.name, "Stop requested");
        self.wake_up();
    }

    /// Whether the owning thread is blocked in the wait step. Advisory only.
    pub fn is_waiting(&self) -> bool {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Get the loop name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Thread that owns this loop.
    pub fn owner_thread(&self) -> ThreadId {
        self.owner
    }

    /// Get the configuration.
    pub fn config(&self) -> &RunLoopConfig {
        &self.config
    }

    /// Get metrics.
    pub fn metrics(&self) -> &Arc<RunLoopMetrics> {
        &self.metrics
    }

    pub(crate) fn check_owner(&self) -> RunLoopResult<()> {
        let caller = thread::current().id();
        if caller != self.owner {
            warn!(run_loop = %self.name, "RunLoop run from a thread that does not own it");
            return Err(RunLoopError::NotOwnerThread {
                name: self.name.clone(),
                owner: self.owner,
                caller,
            });
        }
        Ok(())
    }
}

impl Drop for RunLoop {
    fn drop(&mut self) {
        let lists = self.lists.get_mut().get_mut();
        debug!(
            run_loop = %self.name,
            timers = lists.timers.len(),
            observers = lists.observers.len(),
            sources = lists.sources.len(),
            "RunLoop destroyed"
        );
    }
}

impl std::fmt::Debug for RunLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLoop")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("waiting", &self.is_waiting())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "run_loop_tests.rs"]
mod tests;
