//! Priority levels for cooperative tasks

use core::fmt;
use crate::{SchedError, SchedResult};

/// Number of cooperative priority levels
pub const PRIORITY_LEVELS: usize = 8;

/// Type-safe cooperative priority level: 0 (highest) through 7 (lowest).
///
/// Meaningful only for cooperative dispatch; hardware-timer tasks sit above
/// every cooperative level by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Priority(u8);

impl Priority {
    /// Most urgent level
    pub const HIGHEST: Priority = Priority(0);

    /// Least urgent level
    pub const LOWEST: Priority = Priority(PRIORITY_LEVELS as u8 - 1);

    /// Create a new priority level
    pub fn new(level: u8) -> SchedResult<Self> {
        if level as usize >= PRIORITY_LEVELS {
            Err(SchedError::InvalidPriority)
        } else {
            Ok(Priority(level))
        }
    }

    /// Create a priority without validation (const fn)
    pub const fn new_unchecked(level: u8) -> Self {
        Priority(level)
    }

    /// Get the raw level value
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Slot into per-level arrays
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// True when `self` is more urgent than `other` (lower number)
    pub const fn outranks(self, other: Priority) -> bool {
        self.0 < other.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Priority({})", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Priority {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Priority({})", self.0);
    }
}
