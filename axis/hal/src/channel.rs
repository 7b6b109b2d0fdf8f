//! Timer channel contract
//!
//! Every platform backend implements [`TimerChannel`] once per hardware
//! channel. The scheduler registers channel singletons at startup and binds
//! at most one task to each; arming failure is reported, never fatal, so the
//! caller can fall back to cooperative dispatch.
//!
//! Periods cross this boundary in sub-microseconds; each backend quantizes
//! them for its own counter width and clock rate with
//! [`crate::prepare_period`] and defers long periods through a
//! [`crate::TickGate`].

use axis_core::TaskCallback;
use crate::HalResult;

/// Maximum hardware timer channels the registry will track
pub const MAX_CHANNELS: usize = 4;

/// One interrupt-driven hardware timer channel
pub trait TimerChannel: Sync {
    /// Bring the channel up at the given interrupt priority, firing
    /// `callback` every `sub_micros` sub-microseconds.
    ///
    /// Fails with [`crate::HalError::Busy`] when already armed and
    /// [`crate::HalError::InitFailed`] when the platform timer cannot start.
    /// On failure the channel state is unchanged.
    fn arm(&self, hw_priority: u8, sub_micros: u32, callback: TaskCallback) -> HalResult<()>;

    /// Change the firing period of an armed channel.
    ///
    /// Takes effect at the next interrupt; no tick is lost. A no-op on a
    /// disarmed channel.
    fn reprogram(&self, sub_micros: u32);

    /// Stop interrupts and release the binding. Idempotent.
    fn disarm(&self);
}
