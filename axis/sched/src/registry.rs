//! Task registry and cooperative dispatcher
//!
//! `Scheduler` owns every task slot: handle-based CRUD, the priority-ordered
//! round-robin scan, duration-expiry housekeeping, and hardware channel
//! binding. It is a plain value; the firmware-facing singleton wrapping it in
//! a critical section lives in [`crate::global`].

use axis_core::{
    ClockFn, Period, Priority, SchedError, SchedResult, TaskCallback, TaskHandle, TaskName,
    TimingMode, PRIORITY_LEVELS,
};
use axis_hal::{HalError, TimerChannel, MAX_CHANNELS};

use crate::task::{period_from_hz, Task};
use crate::TASKS_MAX;

#[cfg(feature = "profile")]
use crate::profiler::TaskProfile;

/// Outcome of one dispatch call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A task's callback ran to completion
    Fired(TaskHandle),
    /// A task's duration expired and the slot was removed; nothing ran
    Expired(TaskHandle),
    /// Nothing was due at or above the dispatch floor
    Idle,
}

/// A selected-but-not-yet-run firing (two-phase dispatch).
///
/// The owning task is flagged `running` until [`Scheduler::complete`] is
/// called, so nested dispatch cannot re-enter it.
pub(crate) struct PendingRun {
    pub(crate) handle: TaskHandle,
    pub(crate) callback: TaskCallback,
    pub(crate) level: Priority,
    pub(crate) clock: ClockFn,
}

pub(crate) enum Selection {
    Run(PendingRun),
    /// Expired slot already freed; the unbound channel (if any) still needs
    /// disarming, outside any critical section
    Expired(TaskHandle, Option<&'static dyn TimerChannel>),
    Idle,
}

/// Fixed-capacity task registry + cooperative dispatcher
pub struct Scheduler<const N: usize = TASKS_MAX> {
    slots: [Option<Task>; N],
    generations: [u8; N],
    /// Last-serviced slot per priority level (round-robin cursors)
    cursors: [usize; PRIORITY_LEVELS],
    /// Highest allocated slot index; bounds every scan
    highest_task: usize,
    /// Numerically largest priority level in use
    lowest_priority: u8,
    task_count: usize,
    channels: [Option<&'static dyn TimerChannel>; MAX_CHANNELS],
    /// Bitmap of channels currently bound to a task
    bound_channels: u8,
    clock: ClockFn,
}

impl<const N: usize> Scheduler<N> {
    pub const fn new(clock: ClockFn) -> Self {
        Scheduler {
            slots: [const { None }; N],
            generations: [0; N],
            cursors: [if N > 0 { N - 1 } else { 0 }; PRIORITY_LEVELS],
            highest_task: 0,
            lowest_priority: 0,
            task_count: 0,
            channels: [None; MAX_CHANNELS],
            bound_channels: 0,
            clock,
        }
    }

    /// Install the monotonic microsecond clock every task derives time from
    pub fn set_clock(&mut self, clock: ClockFn) {
        self.clock = clock;
    }

    pub(crate) fn clock(&self) -> ClockFn {
        self.clock
    }

    /// Register a platform timer channel. Channels are numbered 1..=4 in
    /// registration order.
    pub fn register_channel(&mut self, channel: &'static dyn TimerChannel) -> SchedResult<u8> {
        for (i, slot) in self.channels.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(channel);
                return Ok(i as u8 + 1);
            }
        }
        Err(SchedError::HardwareConflict)
    }

    // ----- CRUD -------------------------------------------------------

    /// Create a task. Returns the slot's generation-checked handle, or
    /// [`SchedError::Exhausted`] when every slot is taken.
    pub fn add(
        &mut self,
        period: Period,
        duration_ms: u32,
        repeat: bool,
        priority: Priority,
        callback: TaskCallback,
        name: &str,
    ) -> SchedResult<TaskHandle> {
        let now = (self.clock)();
        for slot in 0..N {
            if self.slots[slot].is_none() {
                self.slots[slot] =
                    Some(Task::new(period, duration_ms, repeat, priority, callback, name, now));
                self.task_count += 1;
                if slot > self.highest_task {
                    self.highest_task = slot;
                }
                if priority.raw() > self.lowest_priority {
                    self.lowest_priority = priority.raw();
                }
                return Ok(TaskHandle::new(slot as u8 + 1, self.generations[slot]));
            }
        }
        Err(SchedError::Exhausted)
    }

    /// Destroy a task, releasing any bound hardware channel.
    ///
    /// Removing a task from inside its own callback is undefined; debug
    /// builds assert against it.
    pub fn remove(&mut self, handle: TaskHandle) -> SchedResult<()> {
        if let Some(channel) = self.release(handle)? {
            channel.disarm();
        }
        Ok(())
    }

    /// Free the slot and unbind its channel without disarming it.
    ///
    /// The caller disarms the returned channel outside any critical section:
    /// on the host port disarm joins the timer thread, and that thread's
    /// callback may itself be waiting on the scheduler lock.
    pub(crate) fn release(
        &mut self,
        handle: TaskHandle,
    ) -> SchedResult<Option<&'static dyn TimerChannel>> {
        let slot = self.slot_of(handle)?;
        let mut channel = None;
        if let Some(task) = self.slots[slot].take() {
            debug_assert!(!task.running, "removing a task that is executing");
            if task.hardware_timer != 0 {
                let i = task.hardware_timer as usize - 1;
                channel = self.channels[i];
                #[cfg(feature = "profile")]
                crate::hw_stats::unbind(i);
                self.bound_channels &= !(1 << i);
            }
        }
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.task_count -= 1;
        self.recompute_bounds();
        Ok(channel)
    }

    // ----- hardware binding ------------------------------------------

    /// Bind a task to a free hardware timer channel.
    ///
    /// Requires `repeat == true` and priority 0. Any failure leaves the task
    /// in the cooperative pool unchanged, so callers can simply keep calling
    /// `dispatch` when no channel is available.
    pub fn request_hardware_timer(&mut self, handle: TaskHandle, hw_priority: u8)
        -> SchedResult<()> {
        let slot = self.slot_of(handle)?;
        let (sub_micros, callback) = {
            let Some(task) = self.slots[slot].as_ref() else {
                return Err(SchedError::StaleHandle);
            };
            if !task.repeat
                || task.priority != Priority::HIGHEST
                || task.hardware_timer != 0
            {
                return Err(SchedError::HardwareConflict);
            }
            (task.scaled_sub_micros()?, task.callback)
        };

        let mut chosen = None;
        for i in 0..MAX_CHANNELS {
            if self.channels[i].is_some() && self.bound_channels & (1 << i) == 0 {
                chosen = Some(i);
                break;
            }
        }
        let Some(i) = chosen else {
            return Err(SchedError::HardwareConflict);
        };
        let Some(channel) = self.channels[i] else {
            return Err(SchedError::HardwareConflict);
        };

        // interrupt invocations bypass finish_run, so profiling goes
        // through a per-channel timestamping shim
        #[cfg(feature = "profile")]
        let callback = crate::hw_stats::bind(i, callback, self.clock);

        if let Err(e) = channel.arm(hw_priority, sub_micros, callback) {
            #[cfg(feature = "profile")]
            crate::hw_stats::unbind(i);
            return Err(match e {
                HalError::InitFailed => SchedError::TimerInit,
                _ => SchedError::HardwareConflict,
            });
        }

        if let Some(task) = self.slots[slot].as_mut() {
            task.hardware_timer = i as u8 + 1;
        }
        self.bound_channels |= 1 << i;
        Ok(())
    }

    /// Reprogram every hardware-bound task with its ratio-corrected period.
    /// Cooperative periods are left alone.
    pub fn refresh_all_periods(&mut self) {
        for slot in 0..N {
            let Some(task) = self.slots[slot].as_ref() else {
                continue;
            };
            if task.hardware_timer == 0 {
                continue;
            }
            let i = task.hardware_timer as usize - 1;
            if let Ok(sub) = task.scaled_sub_micros() {
                if let Some(channel) = self.channels[i] {
                    channel.reprogram(sub);
                }
            }
        }
    }

    // ----- timing mutators -------------------------------------------

    /// Change a task's period. Cooperative tasks pick the change up at their
    /// next scheduling boundary (immediately when a slow task is being sped
    /// up); hardware-bound tasks have their channel reprogrammed right away.
    pub fn set_period(&mut self, handle: TaskHandle, period: Period) -> SchedResult<()> {
        let now = (self.clock)();
        let slot = self.slot_of(handle)?;
        let hw = {
            let Some(task) = self.slots[slot].as_mut() else {
                return Err(SchedError::StaleHandle);
            };
            if task.hardware_timer != 0 {
                // validate before touching the task so failure is side-effect-free
                let sub = axis_core::scale_sub_micros(period.to_sub_micros()?);
                task.next_period = Some(period);
                task.apply_pending(now);
                Some((task.hardware_timer as usize - 1, sub))
            } else {
                task.request_period_change(period, now);
                None
            }
        };
        if let Some((i, sub)) = hw {
            if let Some(channel) = self.channels[i] {
                channel.reprogram(sub);
            }
        }
        Ok(())
    }

    /// Period change expressed as a frequency
    pub fn set_frequency(&mut self, handle: TaskHandle, hz: f32) -> SchedResult<()> {
        let period = period_from_hz(hz)?;
        self.set_period(handle, period)
    }

    /// Change a task's lifetime (0 = unlimited). The window stays anchored
    /// at creation, so a duration shorter than the task's current age
    /// expires it at its next scheduling opportunity.
    pub fn set_duration(&mut self, handle: TaskHandle, duration_ms: u32) -> SchedResult<()> {
        self.task_mut(handle)?.duration_ms = duration_ms;
        Ok(())
    }

    /// Force the task's duration to read as expired, so the dispatcher
    /// removes it at its next scheduling opportunity
    pub fn set_duration_complete(&mut self, handle: TaskHandle) -> SchedResult<()> {
        let now = (self.clock)();
        self.task_mut(handle)?.set_duration_complete(now);
        Ok(())
    }

    pub fn set_repeat(&mut self, handle: TaskHandle, repeat: bool) -> SchedResult<()> {
        self.task_mut(handle)?.repeat = repeat;
        Ok(())
    }

    /// Move a task to another cooperative priority level. Rejected for
    /// hardware-bound tasks, which must stay at priority 0.
    pub fn set_priority(&mut self, handle: TaskHandle, priority: Priority) -> SchedResult<()> {
        let task = self.task_mut(handle)?;
        if task.hardware_timer != 0 && priority != Priority::HIGHEST {
            return Err(SchedError::HardwareConflict);
        }
        task.priority = priority;
        self.recompute_bounds();
        Ok(())
    }

    pub fn set_timing_mode(&mut self, handle: TaskHandle, mode: TimingMode) -> SchedResult<()> {
        self.task_mut(handle)?.timing_mode = mode;
        Ok(())
    }

    // ----- dispatch ---------------------------------------------------

    /// Run at most one due task, honoring no floor. The usual event-loop body.
    pub fn dispatch(&mut self) -> Dispatch {
        self.dispatch_above(None)
    }

    /// Run at most one due task at a level strictly more urgent than
    /// `floor`. This is the reentrancy rule that lets a long callback use
    /// dispatch as a cooperative sleep without being re-entered by peers.
    pub fn dispatch_above(&mut self, floor: Option<Priority>) -> Dispatch {
        match self.select_above(floor) {
            Selection::Run(run) => {
                let start = (run.clock)();
                run.callback.invoke();
                let end = (run.clock)();
                self.complete(run.handle, start, end);
                Dispatch::Fired(run.handle)
            }
            Selection::Expired(handle, channel) => {
                if let Some(channel) = channel {
                    channel.disarm();
                }
                Dispatch::Expired(handle)
            }
            Selection::Idle => Dispatch::Idle,
        }
    }

    /// Keep dispatching until `micros` of clock time have passed. The only
    /// suspension primitive in the system.
    pub fn run_for_micros(&mut self, micros: u64) {
        let deadline = (self.clock)() + micros;
        loop {
            self.dispatch();
            if (self.clock)() >= deadline {
                break;
            }
        }
    }

    /// Millisecond flavor of [`Self::run_for_micros`]
    pub fn run_for_millis(&mut self, millis: u64) {
        self.run_for_micros(millis * 1_000);
    }

    /// Phase one of dispatch: pick the next task. Duration expiry takes
    /// precedence over firing and ends the scan.
    pub(crate) fn select_above(&mut self, floor: Option<Priority>) -> Selection {
        let now = (self.clock)();
        let span = self.highest_task + 1;

        for level in 0..=self.lowest_priority {
            if let Some(floor) = floor {
                if level >= floor.raw() {
                    break;
                }
            }
            let start = self.cursors[level as usize];
            for step in 1..=span {
                let slot = (start + step) % span;
                let Some(task) = self.slots[slot].as_ref() else {
                    continue;
                };
                if task.priority.raw() != level {
                    continue;
                }
                if task.is_duration_complete(now) && !task.running {
                    let handle = TaskHandle::new(slot as u8 + 1, self.generations[slot]);
                    // the slot cannot be stale, we just resolved it
                    let channel = self.release(handle).unwrap_or(None);
                    return Selection::Expired(handle, channel);
                }
                let Some(task) = self.slots[slot].as_mut() else {
                    continue;
                };
                if task.begin_run(now) {
                    let run = PendingRun {
                        handle: TaskHandle::new(slot as u8 + 1, self.generations[slot]),
                        callback: task.callback,
                        level: task.priority,
                        clock: self.clock,
                    };
                    self.cursors[level as usize] = slot;
                    return Selection::Run(run);
                }
            }
        }
        Selection::Idle
    }

    /// Phase two of dispatch: bookkeeping after the callback returned
    pub(crate) fn complete(&mut self, handle: TaskHandle, start_micros: u64, end_micros: u64) {
        if let Ok(task) = self.task_mut(handle) {
            task.finish_run(start_micros, end_micros);
        }
    }

    // ----- introspection ---------------------------------------------

    pub fn task_count(&self) -> usize {
        self.task_count
    }

    pub fn is_allocated(&self, handle: TaskHandle) -> bool {
        self.slot_of(handle).is_ok()
    }

    /// Look a task up by its diagnostic label (first match wins)
    pub fn get_handle_by_name(&self, name: &str) -> Option<TaskHandle> {
        for slot in 0..=self.highest_task.min(N - 1) {
            if let Some(task) = self.slots[slot].as_ref() {
                if task.name.as_str() == name {
                    return Some(TaskHandle::new(slot as u8 + 1, self.generations[slot]));
                }
            }
        }
        None
    }

    /// First allocated handle in slot order
    pub fn first_handle(&self) -> Option<TaskHandle> {
        self.handle_at_or_after(0)
    }

    /// Next allocated handle after `handle`, in slot order
    pub fn next_handle(&self, handle: TaskHandle) -> Option<TaskHandle> {
        let slot = handle.slot()?;
        self.handle_at_or_after(slot + 1)
    }

    pub fn name_of(&self, handle: TaskHandle) -> SchedResult<TaskName> {
        Ok(self.task_ref(handle)?.name.clone())
    }

    pub fn period_of(&self, handle: TaskHandle) -> SchedResult<Period> {
        Ok(self.task_ref(handle)?.period)
    }

    pub fn priority_of(&self, handle: TaskHandle) -> SchedResult<Priority> {
        Ok(self.task_ref(handle)?.priority)
    }

    /// Bound hardware channel number, 0 for cooperative tasks
    pub fn hardware_channel_of(&self, handle: TaskHandle) -> SchedResult<u8> {
        Ok(self.task_ref(handle)?.hardware_timer)
    }

    /// Consume-on-read profiling snapshot for one task
    #[cfg(feature = "profile")]
    pub fn take_profile(&mut self, handle: TaskHandle) -> SchedResult<TaskProfile> {
        let task = self.task_mut(handle)?;
        if task.hardware_timer != 0 {
            // interrupt runtimes accumulate behind the channel shim
            return Ok(crate::hw_stats::take(task.hardware_timer as usize - 1));
        }
        Ok(task.stats.take())
    }

    // ----- internals --------------------------------------------------

    fn handle_at_or_after(&self, from: usize) -> Option<TaskHandle> {
        for slot in from..N {
            if self.slots[slot].is_some() {
                return Some(TaskHandle::new(slot as u8 + 1, self.generations[slot]));
            }
        }
        None
    }

    fn slot_of(&self, handle: TaskHandle) -> SchedResult<usize> {
        let slot = handle.slot().ok_or(SchedError::StaleHandle)?;
        if slot >= N
            || self.slots[slot].is_none()
            || self.generations[slot] != handle.generation()
        {
            return Err(SchedError::StaleHandle);
        }
        Ok(slot)
    }

    fn task_ref(&self, handle: TaskHandle) -> SchedResult<&Task> {
        let slot = self.slot_of(handle)?;
        self.slots[slot].as_ref().ok_or(SchedError::StaleHandle)
    }

    fn task_mut(&mut self, handle: TaskHandle) -> SchedResult<&mut Task> {
        let slot = self.slot_of(handle)?;
        self.slots[slot].as_mut().ok_or(SchedError::StaleHandle)
    }

    fn recompute_bounds(&mut self) {
        self.highest_task = 0;
        self.lowest_priority = 0;
        for slot in 0..N {
            if let Some(task) = self.slots[slot].as_ref() {
                self.highest_task = slot;
                if task.priority.raw() > self.lowest_priority {
                    self.lowest_priority = task.priority.raw();
                }
            }
        }
    }
}
