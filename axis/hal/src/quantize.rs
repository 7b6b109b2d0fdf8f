//! Period quantization
//!
//! Maps an arbitrary requested period (up to ~134 s of sub-microseconds)
//! onto a hardware counter's native width. When the period exceeds the
//! counter range, the ISR runs at a native-range rate and a software repeat
//! factor defers the bound callback to every Nth tick. Pure arithmetic,
//! shared by every platform backend.

/// A quantized period: hardware compare count plus software repeat factor.
///
/// The channel interrupts every `counts` native ticks and invokes the bound
/// callback every `repeat`th interrupt, so the callback period is
/// `counts * repeat` native ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelProgram {
    /// Native compare count per interrupt, always >= 1
    pub counts: u32,
    /// Interrupts per callback invocation, always >= 1
    pub repeat: u32,
}

impl ChannelProgram {
    /// Total native ticks between callback invocations
    pub const fn total_ticks(self) -> u64 {
        self.counts as u64 * self.repeat as u64
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ChannelProgram {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Program({}x{})", self.counts, self.repeat);
    }
}

/// Quantize a sub-microsecond period for a counter of `counter_bits` width
/// running at `ticks_per_micro` native ticks per microsecond.
///
/// Picks the smallest repeat factor whose per-interrupt count fits the
/// counter, then rounds the count to keep `counts * repeat` closest to the
/// requested period. A zero or sub-tick period degenerates to the fastest
/// representable program (`1 x 1`).
pub fn prepare_period(sub_micros: u32, counter_bits: u8, ticks_per_micro: u32) -> ChannelProgram {
    let max_count: u64 = if counter_bits >= 32 {
        u32::MAX as u64
    } else {
        (1u64 << counter_bits) - 1
    };

    let total = sub_micros as u64 * ticks_per_micro as u64
        / axis_core::SUB_MICROS_PER_MICRO as u64;
    if total <= 1 {
        return ChannelProgram { counts: 1, repeat: 1 };
    }

    let repeat = (total + max_count - 1) / max_count;
    let counts = ((total + repeat / 2) / repeat).max(1);

    ChannelProgram {
        counts: counts as u32,
        repeat: repeat as u32,
    }
}
