#![no_std]
#![forbid(unsafe_code)]

//! # Axis Core
//!
//! Core types for the Axis tasking engine: time units, priority levels,
//! generation-checked task handles, the callback model, and the global
//! period-ratio (clock-drift compensation) cell. These are shared by the
//! scheduler, the hardware-timer HAL, and the platform ports.

use core::fmt;

pub mod callback;
pub mod handle;
pub mod priorities;
pub mod ratio;
pub mod time;

pub use callback::*;
pub use handle::*;
pub use priorities::*;
pub use ratio::*;
pub use time::*;


/// Axis tasking engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the tasking engine
pub type SchedResult<T> = Result<T, SchedError>;

/// Monotonic clock source, returning microseconds since an arbitrary epoch.
///
/// Installed once at startup by the platform port; every task derives its
/// own time unit from this.
pub type ClockFn = fn() -> u64;

/// Short diagnostic label attached to a task slot
pub type TaskName = heapless::String<16>;

/// Error types for tasking engine operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// No free task slot remains
    Exhausted,
    /// Priority level outside 0..=7
    InvalidPriority,
    /// Handle refers to a freed or never-allocated slot
    StaleHandle,
    /// Hardware timer channel unavailable or preconditions unmet
    HardwareConflict,
    /// Platform timer channel failed to initialize
    TimerInit,
    /// Period outside the representable sub-microsecond range
    PeriodRange,
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::Exhausted => write!(f, "No free task slot remains"),
            SchedError::InvalidPriority => write!(f, "Priority level outside 0..=7"),
            SchedError::StaleHandle => write!(f, "Handle refers to a freed slot"),
            SchedError::HardwareConflict => write!(f, "Hardware timer channel unavailable"),
            SchedError::TimerInit => write!(f, "Timer channel failed to initialize"),
            SchedError::PeriodRange => write!(f, "Period outside representable range"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SchedError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            SchedError::Exhausted => defmt::write!(fmt, "Exhausted"),
            SchedError::InvalidPriority => defmt::write!(fmt, "InvalidPriority"),
            SchedError::StaleHandle => defmt::write!(fmt, "StaleHandle"),
            SchedError::HardwareConflict => defmt::write!(fmt, "HardwareConflict"),
            SchedError::TimerInit => defmt::write!(fmt, "TimerInit"),
            SchedError::PeriodRange => defmt::write!(fmt, "PeriodRange"),
        }
    }
}
