//! # Looper RunLoop
//!
//! A per-thread event loop that dispatches timers, event sources and phase
//! observers.
//!
//! ## Design Inspiration
//!
//! The architecture follows Apple's CFRunLoop:
//!
//! - **One loop per thread**: a thread's loop is created on first use and
//!   torn down when the thread exits
//! - **Timers**: one-shot or repeating, fired in ascending fire-time order
//! - **Event sources**: flagged by `signal()` from any thread, consumed
//!   exactly once by the owning thread
//! - **Observer phase notifications**: Entry → BeforeTimers → BeforeSources → BeforeWaiting → AfterWaiting → Exit
//! - **Sleep/wake mechanism**: the owning thread blocks until the next timer,
//!   its deadline, or an explicit wake
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       registry (per thread)                       │
//! │           ThreadId → Arc<RunLoop>, removed at thread exit         │
//! └────────────────────────────────┬─────────────────────────────────┘
//!                                  │
//! ┌────────────────────────────────▼─────────────────────────────────┐
//! │                              RunLoop                              │
//! │   list lock (reentrant) ── timers (sorted by fire time)           │
//! │                         ├─ event sources                          │
//! │                         └─ observers + phase mask                 │
//! │   wake signal ───────────── generation counter + condvar          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Components
//!
//! - [`RunLoop`]: The core event loop
//! - [`RunLoopPhase`]: Execution phases (Entry, BeforeTimers, etc.)
//! - [`Timer`]: One-shot and repeating timers
//! - [`EventSource`]: Signal-driven sources
//! - [`Observer`] / [`RunLoopObserver`]: Phase observers
//! - [`RunLoopBackend`]: Capability set shared by all backends
//!
//! ## Example
//!
//! ```rust,no_run
//! use looper_runloop::{RunLoop, RunLoopRunResult, Timer};
//! use std::time::Duration;
//!
//! let run_loop = RunLoop::current();
//! let timer = Timer::once(Duration::from_millis(50), |_| println!("fired"));
//! run_loop.add_timer(&timer).unwrap();
//!
//! let result = run_loop.run_for(Duration::from_secs(1), false).unwrap();
//! assert_eq!(result, RunLoopRunResult::Finished);
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod metrics;
pub mod observer;
pub mod observer_builtin;
pub mod phase;
pub mod registry;
pub mod run_loop;
mod run_loop_execution;
mod run_loop_wakeup;
pub mod source;
pub mod timer;

// Re-exports
pub use backend::RunLoopBackend;
pub use config::RunLoopConfig;
pub use error::{RunLoopError, RunLoopResult};
pub use metrics::{MetricsSnapshot, RunLoopMetrics};
pub use observer::{Observer, RunLoopObserver};
pub use observer_builtin::{LoggingObserver, MetricsObserver};
pub use phase::{RunLoopPhase, RunLoopRunResult};
pub use run_loop::RunLoop;
pub use source::EventSource;
pub use timer::{Timer, TimerBuilder};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
