//! RunLoop waiting and wake-up.
//!
//! A wake request bumps a generation counter. The loop reads the counter
//! before it decides to wait and blocks only while the counter is unchanged,
//! so a request made at any point after that read ends the wait.

use std::sync::atomic::Ordering;
use std::time::Instant;

use parking_lot::{Condvar, Mutex, ReentrantMutexGuard};
use tracing::trace;

use crate::run_loop::RunLoop;
use crate::run_loop_execution::{ListsGuard, timeout_or_timer};

/// Generation counter plus condition variable.
#[derive(Debug, Default)]
pub(crate) struct WakeSignal {
    generation: Mutex<u64>,
    condvar: Condvar,
}

impl WakeSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Current generation.
    pub(crate) fn token(&self) -> u64 {
        *self.generation.lock()
    }

    /// Publish a wake request.
    pub(crate) fn notify(&self) {
        let mut generation = self.generation.lock();
        *generation = generation.wrapping_add(1);
        self.condvar.notify_all();
    }

    /// Block until the generation moves past `token` or `deadline` passes.
    /// Returns `true` if woken by a request.
    pub(crate) fn wait(&self, token: u64, deadline: Option<Instant>) -> bool {
        let mut generation = self.generation.lock();
        loop {
            if *generation != token {
                return true;
            }
            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        return false;
                    }
                    self.condvar.wait_until(&mut generation, deadline);
                }
                None => self.condvar.wait(&mut generation),
            }
        }
    }
}

impl RunLoop {
    /// Wake the loop if it is blocked waiting. Safe from any thread.
    pub fn wake_up(&self) {
        self.metrics.record_wake_request();
        self.wake.notify();
    }

    /// Block in the wait step with the list lock released.
    pub(crate) fn wait_for_wakeup(
        &self,
        guard: &mut ListsGuard<'_>,
        token: u64,
        deadline: Option<Instant>,
    ) {
        let wait_until = {
            let mut lists = guard.borrow_mut();
            let wait_until = timeout_or_timer(&mut lists, deadline);
            lists.wait_deadline = wait_until;
            wait_until
        };
        self.waiting.store(true, Ordering::SeqCst);

        trace!(run_loop = %self.name, "Waiting");
        let started = Instant::now();
        let woken = ReentrantMutexGuard::unlocked(guard, || self.wake.wait(token, wait_until));

        self.waiting.store(false, Ordering::SeqCst);
        {
            let mut lists = guard.borrow_mut();
            lists.waiting_until_timer = None;
            lists.wait_deadline = None;
        }
        trace!(run_loop = %self.name, woken, "Wait finished");
        self.metrics.record_wait(started.elapsed(), woken);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_wait_times_out() {
        let signal = WakeSignal::new();
        let token = signal.token();
        let start = Instant::now();

        assert!(!signal.wait(token, Some(start + Duration::from_millis(30))));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_notify_before_wait_is_not_lost() {
        let signal = WakeSignal::new();
        let token = signal.token();
        signal.notify();

        let start = Instant::now();
        assert!(signal.wait(token, Some(start + Duration::from_secs(5))));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_notify_from_other_thread() {
        let signal = Arc::new(WakeSignal::new());
        let token = signal.token();

        let notifier = signal.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            notifier.notify();
        });

        assert!(signal.wait(token, None));
        handle.join().unwrap();
    }
}
