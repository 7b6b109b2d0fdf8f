//! Global period-ratio (clock-drift compensation) cell
//!
//! Holds the measured sub-microsecond count per true second, nominally
//! 16 000 000. An external pulse-per-second handler (GPS or RTC) stores its
//! measurement here from interrupt context; a low-priority monitor task
//! notices the change later and reprograms every hardware-timer channel.
//! The cell itself never touches a task.

use core::sync::atomic::{AtomicU32, Ordering};
use crate::time::NOMINAL_SUB_MICROS_PER_SEC;

static PERIOD_RATIO: AtomicU32 = AtomicU32::new(NOMINAL_SUB_MICROS_PER_SEC);

/// Store a new measured ratio in sub-microseconds per second.
///
/// Safe to call from interrupt context. A zero value resets to nominal.
pub fn set_period_ratio_sub_micros(value: u32) {
    let value = if value == 0 { NOMINAL_SUB_MICROS_PER_SEC } else { value };
    PERIOD_RATIO.store(value, Ordering::Relaxed);
}

/// Current ratio in sub-microseconds per second
pub fn period_ratio_sub_micros() -> u32 {
    PERIOD_RATIO.load(Ordering::Relaxed)
}

/// Rescale a sub-microsecond period by the current ratio.
///
/// A fast crystal (ratio above nominal) lengthens the programmed period so
/// real elapsed time matches the request. Saturates at the u32 ceiling.
pub fn scale_sub_micros(period: u32) -> u32 {
    let ratio = PERIOD_RATIO.load(Ordering::Relaxed);
    let scaled = period as u64 * ratio as u64 / NOMINAL_SUB_MICROS_PER_SEC as u64;
    scaled.min(u32::MAX as u64) as u32
}
