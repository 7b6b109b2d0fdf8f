//! Shared ISR repeat gate
//!
//! The software half of period quantization. Each platform ISR calls
//! [`TickGate::on_tick`] on every hardware interrupt; the gate counts down
//! the repeat factor and reports when the bound callback is due. Atomics
//! only, so the gate is usable from any interrupt priority.

use core::sync::atomic::{AtomicU32, Ordering};

/// Per-channel repeat countdown
pub struct TickGate {
    remaining: AtomicU32,
    reload: AtomicU32,
}

impl TickGate {
    /// Gate that fires on every tick
    pub const fn new() -> Self {
        TickGate {
            remaining: AtomicU32::new(1),
            reload: AtomicU32::new(1),
        }
    }

    /// Set the repeat factor; a value of 0 or 1 fires on every tick.
    ///
    /// Restarts the countdown from the new factor.
    pub fn load(&self, repeat: u32) {
        let repeat = repeat.max(1);
        self.reload.store(repeat, Ordering::Relaxed);
        self.remaining.store(repeat, Ordering::Relaxed);
    }

    /// Count one hardware tick; true when the callback is due.
    ///
    /// Called from the channel ISR only.
    #[inline]
    pub fn on_tick(&self) -> bool {
        let remaining = self.remaining.load(Ordering::Relaxed);
        if remaining <= 1 {
            self.remaining
                .store(self.reload.load(Ordering::Relaxed), Ordering::Relaxed);
            true
        } else {
            self.remaining.store(remaining - 1, Ordering::Relaxed);
            false
        }
    }
}

impl Default for TickGate {
    fn default() -> Self {
        Self::new()
    }
}
