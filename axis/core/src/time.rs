//! Time units and sub-microsecond arithmetic
//!
//! The engine's finest internal unit is the sub-microsecond, 1/16 µs, chosen
//! so hardware-timer periods are exact across platforms with different native
//! clock rates. A `u32` of sub-microseconds spans periods up to ~134 s,
//! which is the engine-wide period ceiling.

use core::fmt;
use crate::{SchedError, SchedResult};

/// Sub-microseconds per microsecond
pub const SUB_MICROS_PER_MICRO: u32 = 16;

/// Sub-microseconds per millisecond
pub const SUB_MICROS_PER_MILLI: u32 = 16_000;

/// Sub-microseconds per second at nominal crystal rate
pub const NOMINAL_SUB_MICROS_PER_SEC: u32 = 16_000_000;

/// Unit in which a task's period is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeriodUnits {
    /// Period disabled / not meaningful
    #[default]
    None,
    /// Milliseconds
    Millis,
    /// Microseconds
    Micros,
    /// Sub-microseconds (1/16 µs)
    SubMicros,
}

impl PeriodUnits {
    /// Convert a microsecond timestamp into this unit
    pub const fn from_micros(self, micros: u64) -> u64 {
        match self {
            PeriodUnits::None => 0,
            PeriodUnits::Millis => micros / 1_000,
            PeriodUnits::Micros => micros,
            PeriodUnits::SubMicros => micros * SUB_MICROS_PER_MICRO as u64,
        }
    }

    /// Convert a tick count in this unit back to microseconds
    pub const fn to_micros(self, ticks: u64) -> u64 {
        match self {
            PeriodUnits::None => 0,
            PeriodUnits::Millis => ticks * 1_000,
            PeriodUnits::Micros => ticks,
            PeriodUnits::SubMicros => ticks / SUB_MICROS_PER_MICRO as u64,
        }
    }
}

impl fmt::Display for PeriodUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodUnits::None => write!(f, "none"),
            PeriodUnits::Millis => write!(f, "ms"),
            PeriodUnits::Micros => write!(f, "us"),
            PeriodUnits::SubMicros => write!(f, "sub-us"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PeriodUnits {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            PeriodUnits::None => defmt::write!(fmt, "none"),
            PeriodUnits::Millis => defmt::write!(fmt, "ms"),
            PeriodUnits::Micros => defmt::write!(fmt, "us"),
            PeriodUnits::SubMicros => defmt::write!(fmt, "sub-us"),
        }
    }
}

/// A period value together with its unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Period {
    /// Raw period count; 0 disables the task
    pub value: u32,
    /// Unit of `value`
    pub units: PeriodUnits,
}

impl Period {
    /// A disabled (never-fires) period
    pub const DISABLED: Period = Period {
        value: 0,
        units: PeriodUnits::None,
    };

    /// Period in milliseconds
    pub const fn millis(value: u32) -> Self {
        Period { value, units: PeriodUnits::Millis }
    }

    /// Period in microseconds
    pub const fn micros(value: u32) -> Self {
        Period { value, units: PeriodUnits::Micros }
    }

    /// Period in sub-microseconds (1/16 µs)
    pub const fn sub_micros(value: u32) -> Self {
        Period { value, units: PeriodUnits::SubMicros }
    }

    /// True when the period disables firing
    pub const fn is_disabled(self) -> bool {
        self.value == 0
    }

    /// Express this period in sub-microseconds.
    ///
    /// Fails with [`SchedError::PeriodRange`] when the result exceeds the
    /// ~134 s ceiling of the u32 sub-microsecond range.
    pub fn to_sub_micros(self) -> SchedResult<u32> {
        let scale: u32 = match self.units {
            PeriodUnits::None => return Ok(0),
            PeriodUnits::Millis => SUB_MICROS_PER_MILLI,
            PeriodUnits::Micros => SUB_MICROS_PER_MICRO,
            PeriodUnits::SubMicros => 1,
        };
        self.value
            .checked_mul(scale)
            .ok_or(SchedError::PeriodRange)
    }

    /// Period magnitude in microseconds, rounded down (diagnostics only)
    pub const fn as_micros(self) -> u64 {
        match self.units {
            PeriodUnits::None => 0,
            PeriodUnits::Millis => self.value as u64 * 1_000,
            PeriodUnits::Micros => self.value as u64,
            PeriodUnits::SubMicros => self.value as u64 / SUB_MICROS_PER_MICRO as u64,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.units)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Period {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}{}", self.value, self.units);
    }
}

/// Next-fire-time policy applied after each cooperative firing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimingMode {
    /// `next = previous boundary + period`; average rate preserved, a late
    /// task may fire back-to-back to catch up
    #[default]
    Balanced,
    /// `next = start of this firing + period`; minimum start-to-start gap,
    /// drifts under sustained overrun
    Minimum,
    /// `next = end of this firing + period`; minimum end-to-start gap
    Gap,
}

#[cfg(feature = "defmt")]
impl defmt::Format for TimingMode {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            TimingMode::Balanced => defmt::write!(fmt, "Balanced"),
            TimingMode::Minimum => defmt::write!(fmt, "Minimum"),
            TimingMode::Gap => defmt::write!(fmt, "Gap"),
        }
    }
}
