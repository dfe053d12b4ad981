//! Registry teardown. Kept in its own test binary because `shutdown`
//! empties the process-wide registry.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use looper_runloop::{registry, RunLoop, RunLoopRunResult};

#[test]
fn test_shutdown_stops_loops_and_clears_registry() {
    let (ready_tx, ready_rx) = mpsc::channel();
    let worker = thread::spawn(move || {
        let run_loop = RunLoop::current();
        ready_tx.send(()).unwrap();
        run_loop.run_for(Duration::from_secs(30), false).unwrap()
    });

    ready_rx.recv().unwrap();
    let main_loop = RunLoop::current();
    assert_eq!(registry::registered_count(), 2);
    // Let the worker reach its wait.
    thread::sleep(Duration::from_millis(50));

    assert_eq!(registry::shutdown(), 2);
    assert_eq!(registry::registered_count(), 0);
    assert!(registry::run_loop_for(thread::current().id()).is_none());

    assert_eq!(worker.join().unwrap(), RunLoopRunResult::Stopped);

    // The thread keeps its own loop after teardown.
    assert!(std::sync::Arc::ptr_eq(&main_loop, &RunLoop::current()));
    assert_eq!(registry::shutdown(), 0);
}
