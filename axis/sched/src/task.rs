//! The task record: timing, priority, lifetime, and firing rules
//!
//! A `Task` never runs itself; the registry drives it through
//! `begin_run` / `finish_run` (cooperative path) or binds its callback to a
//! hardware channel (interrupt path). Period changes land in `next_period`
//! and are published at a scheduling boundary, never mid-cycle.

use axis_core::{
    Period, Priority, SchedError, SchedResult, TaskCallback, TaskName, TimingMode,
    SUB_MICROS_PER_MICRO,
};

#[cfg(feature = "profile")]
use crate::profiler::TaskStats;

pub(crate) struct Task {
    pub(crate) period: Period,
    /// Pending period change, applied at the next scheduling boundary
    pub(crate) next_period: Option<Period>,
    /// Next due time, in ticks of `period.units`
    pub(crate) next_time: u64,
    /// Boundary the current firing was scheduled for (unit ticks)
    last_scheduled: u64,
    /// Absolute lifetime in ms from creation; 0 = unlimited
    pub(crate) duration_ms: u32,
    /// Creation timestamp in ms
    pub(crate) start_ms: u64,
    pub(crate) repeat: bool,
    pub(crate) priority: Priority,
    /// 0 = cooperative, 1..=4 = bound hardware channel
    pub(crate) hardware_timer: u8,
    /// Reentrancy guard, true only while the callback executes
    pub(crate) running: bool,
    pub(crate) callback: TaskCallback,
    pub(crate) timing_mode: TimingMode,
    pub(crate) name: TaskName,
    #[cfg(feature = "profile")]
    pub(crate) stats: TaskStats,
}

impl Task {
    pub(crate) fn new(
        period: Period,
        duration_ms: u32,
        repeat: bool,
        priority: Priority,
        callback: TaskCallback,
        name: &str,
        now_micros: u64,
    ) -> Self {
        let mut label = TaskName::new();
        for c in name.chars() {
            if label.push(c).is_err() {
                break;
            }
        }
        Task {
            period,
            next_period: None,
            next_time: period.units.from_micros(now_micros) + period.value as u64,
            last_scheduled: 0,
            duration_ms,
            start_ms: now_micros / 1_000,
            repeat,
            priority,
            hardware_timer: 0,
            running: false,
            callback,
            timing_mode: TimingMode::Balanced,
            name: label,
            #[cfg(feature = "profile")]
            stats: TaskStats::new(),
        }
    }

    /// Cooperative due check. When due, marks the task running and records
    /// the scheduled boundary; the caller invokes the callback and then
    /// `finish_run`. Always false for hardware-bound or disabled tasks.
    pub(crate) fn begin_run(&mut self, now_micros: u64) -> bool {
        if self.running || self.hardware_timer != 0 {
            return false;
        }
        if self.period.is_disabled() {
            // a disabled task can only come back through a pending change
            if self.next_period.is_some() {
                self.apply_pending(now_micros);
            }
            if self.period.is_disabled() {
                return false;
            }
        }
        let now = self.period.units.from_micros(now_micros);
        if (self.next_time.wrapping_sub(now) as i64) >= 0 {
            return false;
        }
        self.running = true;
        self.last_scheduled = self.next_time;
        true
    }

    /// Close out a firing: publish any pending period, compute the next due
    /// time per the timing mode, and clear the running guard.
    pub(crate) fn finish_run(&mut self, start_micros: u64, end_micros: u64) {
        #[cfg(feature = "profile")]
        {
            let runtime = end_micros.saturating_sub(start_micros);
            let start_ticks = self.period.units.from_micros(start_micros);
            let jitter = self
                .period
                .units
                .to_micros(start_ticks.wrapping_sub(self.last_scheduled));
            self.stats.record(runtime, Some(jitter));
        }

        if let Some(pending) = self.next_period.take() {
            if pending.units != self.period.units {
                // unit change loses the old phase; restart from now
                self.period = pending;
                self.next_time =
                    pending.units.from_micros(start_micros) + pending.value as u64;
                self.end_cycle();
                return;
            }
            self.period = pending;
        }

        let units = self.period.units;
        let period = self.period.value as u64;
        let start = units.from_micros(start_micros);
        let end = units.from_micros(end_micros);

        self.next_time = match self.timing_mode {
            TimingMode::Balanced => {
                let next = self.last_scheduled.wrapping_add(period);
                #[cfg(not(feature = "queue-missed"))]
                let next = if (start.wrapping_sub(next) as i64) > period as i64 {
                    // more than one period late: skip missed ticks rather
                    // than bursting to catch up
                    start - period
                } else {
                    next
                };
                next
            }
            TimingMode::Minimum => start.wrapping_add(period),
            TimingMode::Gap => end.wrapping_add(period),
        };
        self.end_cycle();
    }

    fn end_cycle(&mut self) {
        if !self.repeat {
            self.period.value = 0;
        }
        self.running = false;
    }

    /// Defer a period change to the next scheduling boundary. Fast path: a
    /// slow task (period > 0.1 s) being sped up takes the new period right
    /// away so rate increases are responsive.
    pub(crate) fn request_period_change(&mut self, period: Period, now_micros: u64) {
        self.next_period = Some(period);
        let current_us = self.period.as_micros();
        if current_us > 100_000 && period.as_micros() < current_us {
            self.apply_pending(now_micros);
        }
    }

    /// Publish the pending period now, restarting the cycle from `now`
    pub(crate) fn apply_pending(&mut self, now_micros: u64) {
        if let Some(pending) = self.next_period.take() {
            self.period = pending;
            self.next_time = pending.units.from_micros(now_micros) + pending.value as u64;
        }
    }

    /// Effective hardware period: sub-microseconds scaled by the global
    /// period ratio
    pub(crate) fn scaled_sub_micros(&self) -> SchedResult<u32> {
        let pending_or_current = self.next_period.unwrap_or(self.period);
        Ok(axis_core::scale_sub_micros(pending_or_current.to_sub_micros()?))
    }

    pub(crate) fn is_duration_complete(&self, now_micros: u64) -> bool {
        if self.duration_ms == 0 {
            return false;
        }
        let now_ms = now_micros / 1_000;
        let deadline = self.start_ms.wrapping_add(self.duration_ms as u64);
        (now_ms.wrapping_sub(deadline) as i64) >= 0
    }

    /// Force the duration check to pass on the next scheduling opportunity,
    /// even for a task mid-way through an unlimited lifetime
    pub(crate) fn set_duration_complete(&mut self, now_micros: u64) {
        self.duration_ms = 1;
        self.start_ms = (now_micros / 1_000).saturating_sub(2);
    }
}

/// Convert a frequency in Hz into the best-precision period representation.
///
/// Sub-microseconds below 1 ms, microseconds below 1 s, milliseconds up to
/// the ~134 s engine ceiling. Non-positive frequencies disable the task.
pub fn period_from_hz(hz: f32) -> SchedResult<Period> {
    if !(hz > 0.0) || !hz.is_finite() {
        return Ok(Period::DISABLED);
    }
    let period_us = 1.0e6_f64 / hz as f64;
    if period_us < 1_000.0 {
        let sub = (period_us * SUB_MICROS_PER_MICRO as f64 + 0.5) as u32;
        Ok(Period::sub_micros(sub.max(1)))
    } else if period_us < 1.0e6 {
        Ok(Period::micros((period_us + 0.5) as u32))
    } else if period_us <= 134.0e6 {
        Ok(Period::millis((period_us / 1_000.0 + 0.5) as u32))
    } else {
        Err(SchedError::PeriodRange)
    }
}
