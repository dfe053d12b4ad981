use super::*;
use std::sync::atomic::AtomicU32;

#[test]
fn test_timer_once() {
    let timer = Timer::once(Duration::from_millis(100), |_| {});

    assert!(!timer.repeats());
    assert!(timer.is_valid());
    assert_eq!(timer.interval(), Duration::ZERO);
    assert_eq!(timer.fire_count(), 0);
    assert!(timer.run_loop().is_none());
}

#[test]
fn test_timer_repeating() {
    let before = Instant::now();
    let timer = Timer::repeating(Duration::from_millis(100), |_| {});

    assert!(timer.repeats());
    assert_eq!(timer.interval(), Duration::from_millis(100));
    assert!(timer.next_fire_time() >= before + Duration::from_millis(100));
}

#[test]
fn test_timer_cancel() {
    let timer = Timer::once(Duration::from_secs(60), |_| {});

    assert!(!timer.is_cancelled());
    timer.cancel();
    assert!(timer.is_cancelled());
    timer.cancel();
    assert!(timer.is_cancelled());
}

#[test]
fn test_timer_set_fire_time() {
    let timer = Timer::once(Duration::from_secs(60), |_| {});
    let target = Instant::now() + Duration::from_secs(5);

    timer.set_next_fire_time(target);
    assert_eq!(timer.next_fire_time(), target);

    timer.set_next_fire_in(Duration::from_secs(30));
    let remaining = timer.next_fire_in();
    assert!(remaining > Duration::from_secs(29));
    assert!(remaining <= Duration::from_secs(30));
}

#[test]
fn test_next_fire_in_saturates() {
    let past = Instant::now().checked_sub(Duration::from_millis(10)).unwrap();
    let timer = Timer::at(past, Duration::ZERO, |_| {});
    assert_eq!(timer.next_fire_in(), Duration::ZERO);
}

#[test]
fn test_timer_fire_invokes_callback() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();
    let timer = Timer::once(Duration::ZERO, move |t| {
        assert!(!t.repeats());
        counter_clone.fetch_add(1, Ordering::SeqCst);
    });

    timer.fire();
    timer.fire();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(timer.fire_count(), 2);
}

#[test]
fn test_timer_builder() {
    let when = Instant::now() + Duration::from_secs(5);
    let timer = TimerBuilder::new()
        .id("builder-test")
        .fire_at(when)
        .interval(Duration::from_secs(1))
        .build(|_| {});

    assert_eq!(timer.id(), "builder-test");
    assert!(timer.repeats());
    assert_eq!(timer.next_fire_time(), when);
}

#[test]
fn test_timer_builder_default() {
    let builder = TimerBuilder::default();
    assert!(builder.id.is_none());
    assert!(builder.interval.is_zero());

    let timer = builder.build(|_| {});
    assert!(!timer.id().is_empty());
    assert!(!timer.repeats());
}

#[test]
fn test_timer_builder_delay_overrides_fire_at() {
    let far = Instant::now() + Duration::from_secs(3600);
    let timer = TimerBuilder::new()
        .fire_at(far)
        .delay(Duration::from_millis(10))
        .build(|_| {});

    assert!(timer.next_fire_time() < far);
}

#[test]
fn test_huge_delays_clamp_to_far_future() {
    let year = Duration::from_secs(365 * 24 * 60 * 60);
    let now = Instant::now();

    let once = Timer::once(Duration::MAX, |_| {});
    let repeating = Timer::repeating(Duration::MAX, |_| {});
    let built = TimerBuilder::new().delay(Duration::MAX).build(|_| {});
    let moved = Timer::once(Duration::ZERO, |_| {});
    moved.set_next_fire_in(Duration::MAX);

    for timer in [&once, &repeating, &built, &moved] {
        assert!(timer.next_fire_time() > now + year);
    }
    assert_eq!(repeating.interval(), Duration::MAX);
}

#[test]
fn test_deadline_after() {
    let now = Instant::now();
    assert_eq!(deadline_after(now, Duration::from_secs(1)), now + Duration::from_secs(1));
    assert!(deadline_after(now, Duration::MAX) > now);
}
