#![no_std]
#![forbid(unsafe_code)]

//! # Axis HAL
//!
//! Hardware-timer channel abstraction for the Axis tasking engine. One
//! implementation module exists per target MCU family, selected by the build
//! configuration; all of them share the platform-independent period
//! quantization in [`quantize`] and the ISR repeat gate in [`gate`].

use core::fmt;

pub mod channel;
pub mod gate;
pub mod quantize;

#[cfg(feature = "cortex-m")]
pub mod systick;

pub use channel::*;
pub use gate::*;
pub use quantize::*;

/// Result type for HAL operations
pub type HalResult<T> = Result<T, HalError>;

/// HAL operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Channel is already armed for another task
    Busy,
    /// Platform timer failed to come up
    InitFailed,
    /// Operation not supported by this implementation
    NotSupported,
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HalError::Busy => write!(f, "channel busy"),
            HalError::InitFailed => write!(f, "timer init failed"),
            HalError::NotSupported => write!(f, "operation not supported"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for HalError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            HalError::Busy => defmt::write!(fmt, "Busy"),
            HalError::InitFailed => defmt::write!(fmt, "InitFailed"),
            HalError::NotSupported => defmt::write!(fmt, "NotSupported"),
        }
    }
}
