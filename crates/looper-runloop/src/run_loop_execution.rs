//! RunLoop dispatch (`run` and `run_for`).

use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use parking_lot::ReentrantMutexGuard;
use tracing::{debug, trace};

use crate::error::RunLoopResult;
use crate::observer::Observer;
use crate::phase::{RunLoopPhase, RunLoopRunResult};
use crate::run_loop::{LoopLists, RunLoop};
use crate::source::EventSource;
use crate::timer::{deadline_after, Timer};

impl RunLoop {
    /// Run the RunLoop, blocking until it is stopped.
    pub fn run(&self) -> RunLoopResult<()> {
        loop {
            if self.run_for(Duration::MAX, false)? == RunLoopRunResult::Stopped {
                return Ok(());
            }
        }
    }

    /// Run a single dispatch pass.
    ///
    /// Returns when the loop is stopped, `timeout` elapses, all timers and
    /// sources are gone, or (with `return_after_source_handled`) right after
    /// the first event source fires. Must be called on the owning thread.
    pub fn run_for(
        &self,
        timeout: Duration,
        return_after_source_handled: bool,
    ) -> RunLoopResult<RunLoopRunResult> {
        self.check_owner()?;

        if self.stop_requested.swap(false, Ordering::SeqCst) {
            debug!(run_loop = %self.name, "Pending stop consumed");
            return Ok(RunLoopRunResult::Stopped);
        }

        let deadline = Instant::now().checked_add(timeout);
        let mut guard = self.lists.lock();
        self.metrics.record_pass();

        let mut had_work = false;
        let result = loop {
            self.metrics.record_iteration();
            // Wake requests issued from here on end the next wait.
            let token = self.wake.token();
            had_work |= guard.borrow().has_work();

            self.run_observers(RunLoopPhase::Entry);

            let timers = self.collect_firing_timers();
            if !timers.is_empty() {
                self.run_observers(RunLoopPhase::BeforeTimers);
                for timer in &timers {
                    self.fire_timer(timer);
                }
            }

            let sources = self.collect_firing_sources(return_after_source_handled);
            if !sources.is_empty() {
                self.run_observers(RunLoopPhase::BeforeSources);
                for source in &sources {
                    source.fire();
                    self.metrics.record_source_fired();
                }
                if return_after_source_handled {
                    break RunLoopRunResult::HandledSource;
                }
            }

            if had_work && !guard.borrow().has_work() {
                break RunLoopRunResult::Finished;
            }
            if self.stop_requested.swap(false, Ordering::SeqCst) {
                break RunLoopRunResult::Stopped;
            }
            if is_past(deadline) {
                break RunLoopRunResult::TimedOut;
            }

            self.run_observers(RunLoopPhase::BeforeWaiting);
            self.wait_for_wakeup(&mut guard, token, deadline);
            self.run_observers(RunLoopPhase::AfterWaiting);

            if self.stop_requested.swap(false, Ordering::SeqCst) {
                break RunLoopRunResult::Stopped;
            }
            if is_past(deadline) && !has_due_work(&guard.borrow()) {
                break RunLoopRunResult::TimedOut;
            }
        };

        self.run_observers(RunLoopPhase::Exit);
        drop(guard);

        debug!(run_loop = %self.name, result = %result, "RunLoop pass finished");
        Ok(result)
    }

    /// Collect due timers in fire order. Cancelled timers met on the way are
    /// dropped from the list.
    fn collect_firing_timers(&self) -> Vec<Arc<Timer>> {
        let now = Instant::now();
        let mut due = Vec::new();
        let mut dead = Vec::new();

        self.with_lists(|lists| {
            for timer in &lists.timers {
                if timer.is_cancelled() {
                    dead.push(timer.clone());
                    continue;
                }
                if timer.next_fire_time() > now {
                    break;
                }
                due.push(timer.clone());
            }
        });

        for timer in dead {
            self.remove_timer(&timer);
        }
        due
    }

    fn fire_timer(&self, timer: &Arc<Timer>) {
        if timer.is_cancelled() {
            self.remove_timer(timer);
            return;
        }
        // An earlier callback may have removed or rescheduled it.
        if !self.contains_timer(timer) {
            return;
        }
        let fire_time = timer.next_fire_time();
        if fire_time > Instant::now() {
            return;
        }

        if timer.repeats() {
            self.reschedule_timer(timer, deadline_after(fire_time, timer.interval()));
        } else {
            timer.cancel();
            self.remove_timer(timer);
        }

        trace!(run_loop = %self.name, timer = %timer.id(), "Firing timer");
        timer.fire();
        self.metrics.record_timer_fired();
    }

    /// Consume pending signals. With `only_one`, stop at the first source
    /// so that other sources keep their signal.
    fn collect_firing_sources(&self, only_one: bool) -> Vec<Arc<EventSource>> {
        let mut firing = Vec::new();
        let mut dead = Vec::new();

        self.with_lists(|lists| {
            for source in &lists.sources {
                if source.is_cancelled() {
                    dead.push(source.clone());
                    continue;
                }
                if source.take_signal() {
                    firing.push(source.clone());
                    if only_one {
                        break;
                    }
                }
            }
        });

        for source in dead {
            self.remove_event_source(&source);
        }
        firing
    }

    /// Notify observers of a phase.
    pub(crate) fn run_observers(&self, phase: RunLoopPhase) {
        if self.config.trace_phases {
            trace!(run_loop = %self.name, "Phase: {}", phase);
        }

        let observers = self.with_lists(|lists| {
            phase
                .matches(lists.observer_mask)
                .then(|| lists.observers.clone())
        });
        let Some(observers) = observers else {
            return;
        };

        let mut finished: Vec<Arc<Observer>> = Vec::new();
        for observer in &observers {
            if observer.is_cancelled() {
                finished.push(observer.clone());
                continue;
            }
            if !observer.should_trigger(phase) {
                continue;
            }
            if !observer.repeats() {
                observer.mark_fired();
                finished.push(observer.clone());
            }
            observer.notify(phase);
            self.metrics.record_observer_notification();
        }

        for observer in finished {
            self.remove_observer(&observer);
        }
    }
}

/// Compute the wait deadline: the caller's deadline, or the first timer's
/// fire time if that comes sooner. Records which timer the wait is keyed on.
pub(crate) fn timeout_or_timer(lists: &mut LoopLists, deadline: Option<Instant>) -> Option<Instant> {
    lists.waiting_until_timer = None;

    let Some(first) = lists.timers.iter().find(|t| !t.is_cancelled()) else {
        return deadline;
    };
    let fire_time = first.next_fire_time();
    if deadline.is_some_and(|d| d <= fire_time) {
        return deadline;
    }
    lists.waiting_until_timer = Some(Arc::downgrade(first));
    Some(fire_time)
}

fn is_past(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

fn has_due_work(lists: &LoopLists) -> bool {
    let now = Instant::now();
    lists
        .timers
        .first()
        .is_some_and(|t| t.next_fire_time() <= now)
        || lists.sources.iter().any(|s| s.is_signaled())
}

/// Type of the guard held across a dispatch pass.
pub(crate) type ListsGuard<'a> = ReentrantMutexGuard<'a, RefCell<LoopLists>>;
