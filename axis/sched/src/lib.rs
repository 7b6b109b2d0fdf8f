#![no_std]
#![forbid(unsafe_code)]

//! # Axis Sched
//!
//! The Axis tasking engine: a fixed-capacity task registry with a
//! priority-ordered, round-robin cooperative dispatcher, hardware-timer
//! channel binding, duration-based lifetimes, and global period-ratio
//! (clock-drift) compensation.
//!
//! There is no OS underneath. Everything in the firmware that needs the CPU
//! registers a callback here and the whole system is driven by two things:
//! repeated calls to `yield` from every subsystem's loop, and up to four
//! hardware timer interrupts for the work whose jitter budget is measured in
//! microseconds (motor step generation, above all).
//!
//! Use [`Scheduler`] directly when you want an owned instance (host tests,
//! SITL); firmware uses the [`global`] singleton.

mod registry;
mod task;

#[cfg(feature = "profile")]
mod hw_stats;
#[cfg(feature = "profile")]
mod profiler;

pub mod global;
pub mod monitor;

pub use registry::{Dispatch, Scheduler};
pub use task::period_from_hz;

#[cfg(feature = "profile")]
pub use profiler::TaskProfile;

pub use axis_core::*;

/// Default registry capacity; raise via the `Scheduler<N>` const parameter
pub const TASKS_MAX: usize = 8;
