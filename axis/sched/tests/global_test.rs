//! The firmware-facing singleton: yield, nested-yield floor, and the monitor

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use axis_hal::{HalError, HalResult, TimerChannel};
use axis_sched::{global, monitor, set_period_ratio_sub_micros, Dispatch, Period, TaskCallback};

static NOW: AtomicU64 = AtomicU64::new(0);

fn clock() -> u64 {
    NOW.load(Ordering::Relaxed)
}

static A_RUNS: AtomicU32 = AtomicU32::new(0);
static B_RUNS: AtomicU32 = AtomicU32::new(0);
static HIGH_RUNS: AtomicU32 = AtomicU32::new(0);
static NESTED_FIRED_HIGH: AtomicBool = AtomicBool::new(false);
static NESTED_THEN_IDLE: AtomicBool = AtomicBool::new(false);

fn high_cb() {
    HIGH_RUNS.fetch_add(1, Ordering::Relaxed);
}

/// Runs long enough for the urgent task to become due, then uses a nested
/// yield as a cooperative sleep
fn a_cb() {
    A_RUNS.fetch_add(1, Ordering::Relaxed);
    // never move time backwards on later invocations
    NOW.fetch_max(260_000, Ordering::Relaxed);

    let first = global::yield_now();
    if let Dispatch::Fired(h) = first {
        if global::get_handle_by_name("high") == Some(h) {
            NESTED_FIRED_HIGH.store(true, Ordering::Relaxed);
        }
    }
    // the urgent level is drained and peers are below the floor
    NESTED_THEN_IDLE.store(global::yield_now() == Dispatch::Idle, Ordering::Relaxed);
}

fn b_cb() {
    B_RUNS.fetch_add(1, Ordering::Relaxed);
}

struct MockChannel {
    armed: AtomicBool,
    last_sub_micros: AtomicU32,
}

impl TimerChannel for MockChannel {
    fn arm(&self, _hw_priority: u8, sub_micros: u32, _callback: TaskCallback) -> HalResult<()> {
        if self.armed.swap(true, Ordering::Relaxed) {
            return Err(HalError::Busy);
        }
        self.last_sub_micros.store(sub_micros, Ordering::Relaxed);
        Ok(())
    }

    fn reprogram(&self, sub_micros: u32) {
        self.last_sub_micros.store(sub_micros, Ordering::Relaxed);
    }

    fn disarm(&self) {
        self.armed.store(false, Ordering::Relaxed);
    }
}

static CHANNEL: MockChannel = MockChannel {
    armed: AtomicBool::new(false),
    last_sub_micros: AtomicU32::new(0),
};

// The global scheduler is process state, so the whole scenario runs as one
// test in its own binary.
#[test]
fn test_global_singleton_end_to_end() {
    global::init(clock);
    set_period_ratio_sub_micros(0);

    let high = global::add(
        Period::millis(150),
        0,
        true,
        1,
        TaskCallback::Function(high_cb),
        "high",
    )
    .unwrap();
    let b = global::add(Period::millis(50), 0, true, 3, TaskCallback::Function(b_cb), "B")
        .unwrap();
    let a = global::add(Period::millis(50), 0, true, 3, TaskCallback::Function(a_cb), "A")
        .unwrap();
    assert_eq!(global::task_count(), 3);
    assert_eq!(global::get_handle_by_name("high"), Some(high));

    // only A and B are due; A wins its level first and yields from inside
    NOW.store(51_000, Ordering::Relaxed);
    assert_eq!(global::yield_now(), Dispatch::Fired(a));
    assert_eq!(A_RUNS.load(Ordering::Relaxed), 1);
    assert!(NESTED_FIRED_HIGH.load(Ordering::Relaxed), "nested yield must reach level 1");
    assert!(NESTED_THEN_IDLE.load(Ordering::Relaxed), "peers may not run under the floor");
    assert_eq!(HIGH_RUNS.load(Ordering::Relaxed), 1);
    assert_eq!(B_RUNS.load(Ordering::Relaxed), 0);

    // with the floor open again the starved peer is next at its level
    assert_eq!(global::yield_now(), Dispatch::Fired(b));
    assert_eq!(B_RUNS.load(Ordering::Relaxed), 1);

    // hardware binding and ratio propagation through the monitor task
    global::register_channel(&CHANNEL).unwrap();
    let stepper = global::add(
        Period::micros(5_000),
        0,
        true,
        0,
        TaskCallback::Function(high_cb),
        "stepper",
    )
    .unwrap();
    global::request_hardware_timer(stepper, 0).unwrap();
    assert_eq!(CHANNEL.last_sub_micros.load(Ordering::Relaxed), 80_000);

    monitor::start_ratio_monitor(1_000).unwrap();
    set_period_ratio_sub_micros(16_016_000);

    // drain everything due, which includes one monitor cycle
    NOW.store(1_400_000, Ordering::Relaxed);
    while global::yield_now() != Dispatch::Idle {}
    assert_eq!(CHANNEL.last_sub_micros.load(Ordering::Relaxed), 80_080);

    // teardown keeps the registry and channel reusable
    global::remove(stepper).unwrap();
    assert!(!CHANNEL.armed.load(Ordering::Relaxed));
    global::remove(a).unwrap();
    global::remove(b).unwrap();
    global::remove(high).unwrap();
    let monitor_handle = global::get_handle_by_name("ratioMon").unwrap();
    global::remove(monitor_handle).unwrap();
    assert_eq!(global::task_count(), 0);
}
