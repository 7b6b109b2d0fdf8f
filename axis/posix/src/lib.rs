//! # Axis POSIX port
//!
//! Host-side backing for the Axis tasking engine: a monotonic microsecond
//! clock and thread-backed timer channels. Used for simulation-in-the-loop
//! runs and for exercising firmware subsystems on a development machine;
//! the scheduling semantics are identical to the embedded targets.

pub mod clock;
pub mod timer;

pub use clock::*;
pub use timer::*;
