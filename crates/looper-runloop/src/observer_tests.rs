use super::*;
use std::sync::atomic::AtomicU32;

#[test]
fn test_observer_handle() {
    struct TestObserver;

    impl RunLoopObserver for TestObserver {
        fn activities(&self) -> u32 {
            RunLoopPhase::Entry as u32
        }

        fn on_phase(&self, _observer: &Observer, _phase: RunLoopPhase) {}
    }

    let handle = Observer::from_handler("test", Arc::new(TestObserver));

    assert_eq!(handle.id(), "test");
    assert!(handle.repeats());
    assert!(handle.should_trigger(RunLoopPhase::Entry));
    assert!(!handle.should_trigger(RunLoopPhase::Exit));
    assert!(!handle.should_remove());

    handle.mark_fired();
    assert!(!handle.should_remove()); // Still repeats by default
    assert!(handle.should_trigger(RunLoopPhase::Entry));
}

#[test]
fn test_non_repeating_observer() {
    let handle = Observer::once(RunLoopPhase::Entry, |_, _| {});

    assert!(!handle.repeats());
    assert!(handle.should_trigger(RunLoopPhase::Entry));
    handle.mark_fired();
    assert!(!handle.should_trigger(RunLoopPhase::Entry));
    assert!(handle.should_remove());
}

#[test]
fn test_cancelled_observer_never_triggers() {
    let handle = Observer::new(RunLoopPhase::ALL, true, |_, _| {});
    handle.cancel();
    assert!(handle.is_cancelled());
    assert!(!handle.should_trigger(RunLoopPhase::Entry));
    assert!(!handle.should_trigger(RunLoopPhase::BeforeWaiting));
}

#[test]
fn test_closure_observer_receives_phase() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();
    let mask = RunLoopPhase::mask(&[RunLoopPhase::BeforeTimers, RunLoopPhase::AfterWaiting]);

    let handle = Observer::new(mask, true, move |observer, phase| {
        assert!(phase.matches(observer.activities()));
        counter_clone.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(handle.activities(), mask);
    handle.notify(RunLoopPhase::BeforeTimers);
    handle.notify(RunLoopPhase::AfterWaiting);
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_identity_is_handle_not_value() {
    let a = Observer::new(RunLoopPhase::Entry as u32, true, |_, _| {});
    let b = Observer::new(RunLoopPhase::Entry as u32, true, |_, _| {});
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(a.activities(), b.activities());
}
