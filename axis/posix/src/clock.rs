//! Monotonic clock service for the host
//!
//! Microseconds since first use, from `Instant` so wall-clock adjustments
//! cannot run the scheduler backwards.

use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Microseconds since the port was initialized
pub fn now_micros() -> u64 {
    EPOCH.get_or_init(Instant::now).elapsed().as_micros() as u64
}

/// Pin the epoch and install the clock into the global scheduler
pub fn init() {
    EPOCH.get_or_init(Instant::now);
    axis_sched::global::init(now_micros);
}
