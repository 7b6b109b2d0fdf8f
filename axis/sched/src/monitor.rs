//! Period-ratio propagation
//!
//! A pulse-per-second interrupt only *stores* a new drift measurement (see
//! [`axis_core::set_period_ratio_sub_micros`]); reprogramming hardware
//! channels from inside the PPS handler would be far too much work for an
//! ISR. This low-priority monitor task does the propagation lazily: each
//! cycle it compares the stored ratio against the last value it saw and, on
//! change, reprograms every hardware-bound task with the corrected period.

use core::sync::atomic::{AtomicU32, Ordering};

use axis_core::{
    period_ratio_sub_micros, Period, Priority, SchedResult, TaskCallback, TaskHandle,
    NOMINAL_SUB_MICROS_PER_SEC,
};

static LAST_RATIO: AtomicU32 = AtomicU32::new(NOMINAL_SUB_MICROS_PER_SEC);

fn monitor_tick() {
    let current = period_ratio_sub_micros();
    if LAST_RATIO.swap(current, Ordering::Relaxed) != current {
        crate::global::with_scheduler(|s| s.refresh_all_periods());
    }
}

/// Add the ratio monitor to the global scheduler.
///
/// `period_ms` bounds how stale a drift correction can be before it reaches
/// the timer hardware; one second is plenty for crystal drift.
pub fn start_ratio_monitor(period_ms: u32) -> SchedResult<TaskHandle> {
    crate::global::add(
        Period::millis(period_ms),
        0,
        true,
        Priority::LOWEST.raw(),
        TaskCallback::Function(monitor_tick),
        "ratioMon",
    )
}
