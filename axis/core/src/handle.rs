//! Generation-checked task handles
//!
//! A handle is a 1-based slot index paired with the slot's generation at
//! allocation time. The registry bumps a slot's generation when the slot is
//! freed, so a handle kept past `remove` misses cleanly instead of touching
//! whatever task reused the slot.

use core::fmt;

/// Opaque reference to a task slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskHandle {
    index: u8,
    generation: u8,
}

impl TaskHandle {
    /// The always-invalid handle (index 0)
    pub const NULL: TaskHandle = TaskHandle { index: 0, generation: 0 };

    /// Construct a handle from a 1-based slot index and generation.
    ///
    /// Only the registry mints meaningful handles; anything else is
    /// indistinguishable from a stale handle.
    pub const fn new(index: u8, generation: u8) -> Self {
        TaskHandle { index, generation }
    }

    /// 1-based slot index; 0 for the null handle
    pub const fn index(self) -> u8 {
        self.index
    }

    /// 0-based slot array position, or `None` for the null handle
    pub const fn slot(self) -> Option<usize> {
        if self.index == 0 {
            None
        } else {
            Some(self.index as usize - 1)
        }
    }

    /// Generation stamp the handle was issued with
    pub const fn generation(self) -> u8 {
        self.generation
    }

    /// True for the null handle
    pub const fn is_null(self) -> bool {
        self.index == 0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Handle(null)")
        } else {
            write!(f, "Handle({}.{})", self.index, self.generation)
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TaskHandle {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Handle({}.{})", self.index, self.generation);
    }
}
