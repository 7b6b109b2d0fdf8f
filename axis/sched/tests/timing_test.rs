//! Timing modes under overrun, deferred period changes, and the profiler

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use axis_sched::{Period, Priority, Scheduler, TaskCallback, TimingMode};

#[test]
fn test_balanced_rate_survives_overrun() {
    static NOW: AtomicU64 = AtomicU64::new(0);
    fn clock() -> u64 {
        NOW.load(Ordering::Relaxed)
    }
    static RUNS: AtomicU32 = AtomicU32::new(0);
    // every invocation burns 20 ms of simulated time
    fn overrunning() {
        RUNS.fetch_add(1, Ordering::Relaxed);
        NOW.fetch_add(20_000, Ordering::Relaxed);
    }

    let mut sched: Scheduler = Scheduler::new(clock);
    sched
        .add(
            Period::millis(100),
            0,
            true,
            Priority::HIGHEST,
            TaskCallback::Function(overrunning),
            "overrun",
        )
        .unwrap();

    // drive 5 s of simulated time in 1 ms steps
    while NOW.load(Ordering::Relaxed) < 5_000_000 {
        NOW.fetch_add(1_000, Ordering::Relaxed);
        sched.dispatch();
    }

    // average rate converges to 1/period, not 1/(period + overrun)
    let runs = RUNS.load(Ordering::Relaxed);
    assert!(
        (48..=52).contains(&runs),
        "expected ~50 firings in 5 s at 100 ms, got {}",
        runs
    );
}

#[test]
fn test_minimum_mode_stretches_under_late_starts() {
    static NOW: AtomicU64 = AtomicU64::new(0);
    fn clock() -> u64 {
        NOW.load(Ordering::Relaxed)
    }
    static ANCHORED: AtomicU32 = AtomicU32::new(0);
    static STRETCHED: AtomicU32 = AtomicU32::new(0);
    fn anchored() {
        ANCHORED.fetch_add(1, Ordering::Relaxed);
    }
    fn stretched() {
        STRETCHED.fetch_add(1, Ordering::Relaxed);
    }

    let mut sched: Scheduler = Scheduler::new(clock);
    sched
        .add(
            Period::millis(100),
            0,
            true,
            Priority::HIGHEST,
            TaskCallback::Function(anchored),
            "balanced",
        )
        .unwrap();
    let h = sched
        .add(
            Period::millis(100),
            0,
            true,
            Priority::HIGHEST,
            TaskCallback::Function(stretched),
            "minimum",
        )
        .unwrap();
    sched.set_timing_mode(h, TimingMode::Minimum).unwrap();

    // coarse 50 ms polling: every start is up to 50 ms late
    while NOW.load(Ordering::Relaxed) < 5_000_000 {
        NOW.fetch_add(50_000, Ordering::Relaxed);
        while sched.dispatch() != axis_sched::Dispatch::Idle {}
    }

    // balanced absorbs the lateness (boundaries stay on the 100 ms grid);
    // minimum restarts from each late start, so its gap becomes 150 ms
    let anchored = ANCHORED.load(Ordering::Relaxed);
    let stretched = STRETCHED.load(Ordering::Relaxed);
    assert!(
        (47..=51).contains(&anchored),
        "balanced should hold ~50 firings, got {}",
        anchored
    );
    assert!(
        (31..=35).contains(&stretched),
        "minimum should stretch to ~33 firings, got {}",
        stretched
    );
}

#[test]
fn test_cooperative_period_change_defers_to_boundary() {
    static NOW: AtomicU64 = AtomicU64::new(0);
    fn clock() -> u64 {
        NOW.load(Ordering::Relaxed)
    }
    static RUNS: AtomicU32 = AtomicU32::new(0);
    fn run() {
        RUNS.fetch_add(1, Ordering::Relaxed);
    }

    let mut sched: Scheduler = Scheduler::new(clock);
    let h = sched
        .add(
            Period::millis(50),
            0,
            true,
            Priority::HIGHEST,
            TaskCallback::Function(run),
            "retimed",
        )
        .unwrap();

    // request a slower rate mid-cycle; the visible period is unchanged
    NOW.store(10_000, Ordering::Relaxed);
    sched.set_period(h, Period::millis(200)).unwrap();
    assert_eq!(sched.period_of(h).unwrap().value, 50);

    // old boundary still fires...
    NOW.store(51_000, Ordering::Relaxed);
    sched.dispatch();
    assert_eq!(RUNS.load(Ordering::Relaxed), 1);
    // ...and the new period governs from that boundary on
    assert_eq!(sched.period_of(h).unwrap().value, 200);
    NOW.store(240_000, Ordering::Relaxed);
    sched.dispatch();
    assert_eq!(RUNS.load(Ordering::Relaxed), 1);
    NOW.store(251_000, Ordering::Relaxed);
    sched.dispatch();
    assert_eq!(RUNS.load(Ordering::Relaxed), 2);
}

#[test]
fn test_set_frequency_resolves_units() {
    static NOW: AtomicU64 = AtomicU64::new(0);
    fn clock() -> u64 {
        NOW.load(Ordering::Relaxed)
    }
    fn nop() {}

    let mut sched: Scheduler = Scheduler::new(clock);
    let h = sched
        .add(
            Period::millis(1_000),
            0,
            true,
            Priority::HIGHEST,
            TaskCallback::Function(nop),
            "hz",
        )
        .unwrap();

    // 5 kHz lands in sub-microseconds for precision; fast-path applies it
    // immediately because the task was slow
    sched.set_frequency(h, 5_000.0).unwrap();
    let period = sched.period_of(h).unwrap();
    assert_eq!(period, Period::sub_micros(3_200));
}

#[cfg(feature = "profile")]
#[test]
fn test_profiler_consumes_on_read() {
    static NOW: AtomicU64 = AtomicU64::new(0);
    fn clock() -> u64 {
        NOW.load(Ordering::Relaxed)
    }
    // each run takes 5 ms of simulated time
    fn slow() {
        NOW.fetch_add(5_000, Ordering::Relaxed);
    }

    let mut sched: Scheduler = Scheduler::new(clock);
    let h = sched
        .add(
            Period::millis(100),
            0,
            true,
            Priority::HIGHEST,
            TaskCallback::Function(slow),
            "profiled",
        )
        .unwrap();

    for _ in 0..4 {
        NOW.fetch_add(101_000, Ordering::Relaxed);
        sched.dispatch();
    }

    let profile = sched.take_profile(h).unwrap();
    assert_eq!(profile.invocations, 4);
    assert_eq!(profile.total_runtime_us, 20_000);
    assert_eq!(profile.worst_runtime_us, 5_000);
    assert!(profile.worst_jitter_us > 0);

    // consume-on-read: the accumulator restarts
    let empty = sched.take_profile(h).unwrap();
    assert_eq!(empty.invocations, 0);
    assert_eq!(empty.total_runtime_us, 0);
}
