//! Per-task timing instrumentation
//!
//! Wraps every invocation, cooperative and hardware-timer, with elapsed-time
//! accounting. There is no external profiling tool on the target hardware,
//! so every getter consumes its accumulator on read.

/// Accumulated timing for one task slot
pub(crate) struct TaskStats {
    total_runtime_us: u64,
    invocations: u32,
    worst_runtime_us: u64,
    worst_jitter_us: u64,
    jitter_sum_us: u64,
    jitter_count: u32,
}

impl TaskStats {
    pub(crate) const fn new() -> Self {
        TaskStats {
            total_runtime_us: 0,
            invocations: 0,
            worst_runtime_us: 0,
            worst_jitter_us: 0,
            jitter_sum_us: 0,
            jitter_count: 0,
        }
    }

    /// Account one invocation. `jitter_us` is actual-vs-scheduled start
    /// lateness; hardware invocations have no cooperative boundary and pass
    /// `None`.
    pub(crate) fn record(&mut self, runtime_us: u64, jitter_us: Option<u64>) {
        self.total_runtime_us = self.total_runtime_us.saturating_add(runtime_us);
        self.invocations = self.invocations.saturating_add(1);
        if runtime_us > self.worst_runtime_us {
            self.worst_runtime_us = runtime_us;
        }
        if let Some(jitter) = jitter_us {
            self.jitter_sum_us = self.jitter_sum_us.saturating_add(jitter);
            self.jitter_count = self.jitter_count.saturating_add(1);
            if jitter > self.worst_jitter_us {
                self.worst_jitter_us = jitter;
            }
        }
    }

    /// Snapshot and reset (consume-on-read)
    pub(crate) fn take(&mut self) -> TaskProfile {
        let profile = TaskProfile {
            total_runtime_us: self.total_runtime_us,
            invocations: self.invocations,
            worst_runtime_us: self.worst_runtime_us,
            worst_jitter_us: self.worst_jitter_us,
            average_jitter_us: if self.jitter_count > 0 {
                self.jitter_sum_us / self.jitter_count as u64
            } else {
                0
            },
        };
        *self = TaskStats::new();
        profile
    }
}

/// One consume-on-read profiling snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskProfile {
    /// Total callback runtime since the last read
    pub total_runtime_us: u64,
    /// Invocations since the last read
    pub invocations: u32,
    /// Worst single-invocation runtime since the last read
    pub worst_runtime_us: u64,
    /// Worst cooperative arrival jitter since the last read
    pub worst_jitter_us: u64,
    /// Mean cooperative arrival jitter since the last read
    pub average_jitter_us: u64,
}

#[cfg(feature = "defmt")]
impl defmt::Format for TaskProfile {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "Profile{{n: {}, total: {}us, worst: {}us, jitter: {}us}}",
            self.invocations,
            self.total_runtime_us,
            self.worst_runtime_us,
            self.worst_jitter_us
        );
    }
}
