//! Drift compensation: the period ratio and its hardware propagation

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use axis_hal::{HalError, HalResult, TimerChannel};
use axis_sched::{
    set_period_ratio_sub_micros, Period, Priority, Scheduler, TaskCallback,
    NOMINAL_SUB_MICROS_PER_SEC,
};

struct MockChannel {
    armed: AtomicBool,
    last_sub_micros: AtomicU32,
    reprogram_calls: AtomicU32,
}

impl MockChannel {
    const fn new() -> Self {
        MockChannel {
            armed: AtomicBool::new(false),
            last_sub_micros: AtomicU32::new(0),
            reprogram_calls: AtomicU32::new(0),
        }
    }
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
        self.reprogram_calls.fetch_add(1, Ordering::Relaxed);
    }

    fn disarm(&self) {
        self.armed.store(false, Ordering::Relaxed);
    }
}

fn nop() {}

// The ratio cell is process-global; everything that touches it runs in this
// one test, and this file is its own test binary.
#[test]
fn test_ratio_rescales_hardware_periods_only() {
    static NOW: AtomicU64 = AtomicU64::new(0);
    fn clock() -> u64 {
        NOW.load(Ordering::Relaxed)
    }
    static CH: MockChannel = MockChannel::new();

    set_period_ratio_sub_micros(0);

    let mut sched: Scheduler = Scheduler::new(clock);
    sched.register_channel(&CH).unwrap();

    let stepper = sched
        .add(
            Period::micros(5_000),
            0,
            true,
            Priority::HIGHEST,
            TaskCallback::Function(nop),
            "stepper",
        )
        .unwrap();
    let poller = sched
        .add(
            Period::millis(20),
            0,
            true,
            Priority::new(3).unwrap(),
            TaskCallback::Function(nop),
            "poller",
        )
        .unwrap();
    sched.request_hardware_timer(stepper, 0).unwrap();
    assert_eq!(CH.last_sub_micros.load(Ordering::Relaxed), 80_000);

    // a PPS handler reports the crystal 0.1% fast
    set_period_ratio_sub_micros(16_016_000);
    sched.refresh_all_periods();
    assert_eq!(CH.reprogram_calls.load(Ordering::Relaxed), 1);
    // programmed period lengthens so real elapsed time matches the request
    assert_eq!(CH.last_sub_micros.load(Ordering::Relaxed), 80_080);

    // the cooperative task keeps its clock-derived timing untouched
    assert_eq!(sched.period_of(poller).unwrap(), Period::millis(20));

    // arming while a ratio is in effect programs the corrected period
    sched.remove(stepper).unwrap();
    let rearmed = sched
        .add(
            Period::micros(5_000),
            0,
            true,
            Priority::HIGHEST,
            TaskCallback::Function(nop),
            "stepper",
        )
        .unwrap();
    sched.request_hardware_timer(rearmed, 0).unwrap();
    assert_eq!(CH.last_sub_micros.load(Ordering::Relaxed), 80_080);

    // zero resets to nominal
    set_period_ratio_sub_micros(0);
    assert_eq!(
        axis_sched::period_ratio_sub_micros(),
        NOMINAL_SUB_MICROS_PER_SEC
    );
    sched.refresh_all_periods();
    assert_eq!(CH.last_sub_micros.load(Ordering::Relaxed), 80_000);
}
