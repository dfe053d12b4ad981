//! Process-wide registry of per-thread RunLoops.
//!
//! Each thread gets its RunLoop on the first call to [`current`]. The entry
//! is removed when the thread exits.
//!
//! The main thread's slot is not reliably dropped at process exit, so the
//! registry is torn down explicitly: call [`shutdown`] once before leaving
//! `main`. It stops every registered loop and empties the map.

use std::sync::Arc;
use std::thread::{self, ThreadId};

use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::RunLoopConfig;
use crate::run_loop::RunLoop;

static REGISTRY: Lazy<DashMap<ThreadId, Arc<RunLoop>>> = Lazy::new(DashMap::new);

static DEFAULT_CONFIG: Lazy<RwLock<RunLoopConfig>> =
    Lazy::new(|| RwLock::new(RunLoopConfig::default()));

/// Thread-local handle whose drop runs the thread-exit teardown.
struct ThreadSlot {
    thread: ThreadId,
    run_loop: Arc<RunLoop>,
}

impl ThreadSlot {
    fn new() -> Self {
        let run_loop = RunLoop::new(default_config());
        let thread = run_loop.owner_thread();
        REGISTRY.insert(thread, run_loop.clone());
        debug!(run_loop = %run_loop.name(), "RunLoop registered for thread");
        Self { thread, run_loop }
    }
}

impl Drop for ThreadSlot {
    fn drop(&mut self) {
        REGISTRY.remove(&self.thread);
        debug!(run_loop = %self.run_loop.name(), "RunLoop unregistered at thread exit");
    }
}

thread_local! {
    static CURRENT: ThreadSlot = ThreadSlot::new();
}

/// The calling thread's RunLoop, created and registered on first use.
///
/// During thread teardown, after the thread's slot is gone, a fresh
/// unregistered loop is returned instead.
pub fn current() -> Arc<RunLoop> {
    CURRENT
        .try_with(|slot| slot.run_loop.clone())
        .unwrap_or_else(|_| {
            warn!(thread = ?thread::current().id(), "RunLoop requested during thread teardown");
            RunLoop::new(default_config())
        })
}

/// RunLoop registered for `thread`, if that thread has one.
pub fn run_loop_for(thread: ThreadId) -> Option<Arc<RunLoop>> {
    REGISTRY.get(&thread).map(|entry| entry.value().clone())
}

/// Number of threads with a registered RunLoop.
pub fn registered_count() -> usize {
    REGISTRY.len()
}

/// Stop every registered RunLoop. Returns how many were signalled.
pub fn stop_all() -> usize {
    let run_loops: Vec<Arc<RunLoop>> = REGISTRY.iter().map(|e| e.value().clone()).collect();
    for run_loop in &run_loops {
        run_loop.stop();
    }
    run_loops.len()
}

/// Process-exit teardown: stop every registered RunLoop and drop the
/// registry's references to them. Returns how many loops were released.
///
/// Threads that keep running still hold their own loop; a later
/// [`current`] on such a thread returns that loop, unregistered.
pub fn shutdown() -> usize {
    let count = stop_all();
    REGISTRY.clear();
    debug!(count, "RunLoop registry shut down");
    count
}

/// Set the configuration used for RunLoops created from now on.
pub fn set_default_config(config: RunLoopConfig) {
    *DEFAULT_CONFIG.write() = config;
}

/// Configuration used for newly created thread RunLoops.
pub fn default_config() -> RunLoopConfig {
    DEFAULT_CONFIG.read().clone()
}
