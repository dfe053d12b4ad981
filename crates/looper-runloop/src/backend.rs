//! Backend capability set.
//!
//! [`RunLoopBackend`] is the contract every run-loop backend satisfies. The
//! self-hosted [`RunLoop`] implements it here; an adapter over a host
//! scheduler lives outside this crate and must keep the same exit reasons,
//! idempotent add/remove, and cross-thread wake guarantees.

use std::sync::Arc;
use std::time::Duration;

use crate::error::RunLoopResult;
use crate::observer::Observer;
use crate::phase::RunLoopRunResult;
use crate::run_loop::RunLoop;
use crate::source::EventSource;
use crate::timer::Timer;

/// Operations shared by all run-loop backends.
pub trait RunLoopBackend: Send + Sync {
    fn add_timer(&self, timer: &Arc<Timer>) -> RunLoopResult<()>;
    fn remove_timer(&self, timer: &Timer);
    fn contains_timer(&self, timer: &Timer) -> bool;

    fn add_event_source(&self, source: &Arc<EventSource>) -> RunLoopResult<()>;
    fn remove_event_source(&self, source: &EventSource);
    fn contains_event_source(&self, source: &EventSource) -> bool;

    fn add_observer(&self, observer: &Arc<Observer>) -> RunLoopResult<()>;
    fn remove_observer(&self, observer: &Observer);
    fn contains_observer(&self, observer: &Observer) -> bool;

    /// Block until stopped.
    fn run(&self) -> RunLoopResult<()>;

    /// Run one dispatch pass.
    fn run_for(
        &self,
        timeout: Duration,
        return_after_source_handled: bool,
    ) -> RunLoopResult<RunLoopRunResult>;

    fn stop(&self);
    fn wake_up(&self);

    /// Advisory; may be stale by the time it returns.
    fn is_waiting(&self) -> bool;
}

impl RunLoopBackend for RunLoop {
    fn add_timer(&self, timer: &Arc<Timer>) -> RunLoopResult<()> {
        RunLoop::add_timer(self, timer)
    }

    fn remove_timer(&self, timer: &Timer) {
        RunLoop::remove_timer(self, timer)
    }

    fn contains_timer(&self, timer: &Timer) -> bool {
        RunLoop::contains_timer(self, timer)
    }

    fn add_event_source(&self, source: &Arc<EventSource>) -> RunLoopResult<()> {
        RunLoop::add_event_source(self, source)
    }

    fn remove_event_source(&self, source: &EventSource) {
        RunLoop::remove_event_source(self, source)
    }

    fn contains_event_source(&self, source: &EventSource) -> bool {
        RunLoop::contains_event_source(self, source)
    }

    fn add_observer(&self, observer: &Arc<Observer>) -> RunLoopResult<()> {
        RunLoop::add_observer(self, observer)
    }

    fn remove_observer(&self, observer: &Observer) {
        RunLoop::remove_observer(self, observer)
    }

    fn contains_observer(&self, observer: &Observer) -> bool {
        RunLoop::contains_observer(self, observer)
    }

    fn run(&self) -> RunLoopResult<()> {
        RunLoop::run(self)
    }

    fn run_for(
        &self,
        timeout: Duration,
        return_after_source_handled: bool,
    ) -> RunLoopResult<RunLoopRunResult> {
        RunLoop::run_for(self, timeout, return_after_source_handled)
    }

    fn stop(&self) {
        RunLoop::stop(self)
    }

    fn wake_up(&self) {
        RunLoop::wake_up(self)
    }

    fn is_waiting(&self) -> bool {
        RunLoop::is_waiting(self)
    }
}
