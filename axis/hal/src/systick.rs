//! SysTick-backed reference channel for Cortex-M targets
//!
//! SysTick is a 24-bit down-counter present on every Cortex-M core, which
//! makes it the portable fallback when no vendor timer block is wired up.
//! The application hands the `SYST` peripheral to [`SysTickChannel::install`]
//! once and forwards the `SysTick` exception to [`SysTickChannel::on_tick`].

use core::cell::RefCell;
use critical_section::Mutex;
use cortex_m::peripheral::{syst::SystClkSource, SYST};

use axis_core::TaskCallback;
use crate::{prepare_period, HalError, HalResult, TickGate, TimerChannel};

/// SysTick counter width
pub const SYSTICK_BITS: u8 = 24;

// RELOAD = 0 halts the counter, so the fastest legal program still reloads
// to 1 (an interrupt every 2 ticks)
const fn reload_for(counts: u32) -> u32 {
    let reload = counts.saturating_sub(1);
    if reload == 0 {
        1
    } else {
        reload
    }
}

struct Inner {
    syst: Option<SYST>,
    callback: Option<TaskCallback>,
    ticks_per_micro: u32,
}

/// The single SysTick channel
pub struct SysTickChannel {
    inner: Mutex<RefCell<Inner>>,
    gate: TickGate,
}

impl SysTickChannel {
    pub const fn new() -> Self {
        SysTickChannel {
            inner: Mutex::new(RefCell::new(Inner {
                syst: None,
                callback: None,
                ticks_per_micro: 1,
            })),
            gate: TickGate::new(),
        }
    }

    /// Take ownership of the SysTick peripheral, clocked from the core at
    /// `core_hz`. Must run before `arm`.
    pub fn install(&self, mut syst: SYST, core_hz: u32) {
        syst.set_clock_source(SystClkSource::Core);
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            inner.syst = Some(syst);
            inner.ticks_per_micro = (core_hz / 1_000_000).max(1);
        });
    }

    /// Forward of the `SysTick` exception handler.
    ///
    /// Counts the repeat gate down and runs the bound callback when due.
    pub fn on_tick(&self) {
        if !self.gate.on_tick() {
            return;
        }
        let callback = critical_section::with(|cs| self.inner.borrow_ref(cs).callback);
        if let Some(callback) = callback {
            callback.invoke();
        }
    }
}

impl Default for SysTickChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerChannel for SysTickChannel {
    fn arm(&self, _hw_priority: u8, sub_micros: u32, callback: TaskCallback) -> HalResult<()> {
        // SysTick is a core exception; its priority lives in SCB SHPR owned
        // by the application, so hw_priority is ignored here.
        let repeat = critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if inner.callback.is_some() {
                return Err(HalError::Busy);
            }
            let program = prepare_period(sub_micros, SYSTICK_BITS, inner.ticks_per_micro);
            let syst = inner.syst.as_mut().ok_or(HalError::InitFailed)?;
            syst.set_reload(reload_for(program.counts));
            syst.clear_current();
            syst.enable_interrupt();
            syst.enable_counter();
            inner.callback = Some(callback);
            Ok(program.repeat)
        })?;
        self.gate.load(repeat);
        Ok(())
    }

    fn reprogram(&self, sub_micros: u32) {
        let repeat = critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if inner.callback.is_none() {
                return None;
            }
            let program = prepare_period(sub_micros, SYSTICK_BITS, inner.ticks_per_micro);
            if let Some(syst) = inner.syst.as_mut() {
                syst.set_reload(reload_for(program.counts));
            }
            Some(program.repeat)
        });
        if let Some(repeat) = repeat {
            self.gate.load(repeat);
        }
    }

    fn disarm(&self) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if let Some(syst) = inner.syst.as_mut() {
                syst.disable_interrupt();
                syst.disable_counter();
            }
            inner.callback = None;
        });
    }
}
