//! Firmware-facing singleton layer
//!
//! OS-less targets have exactly one scheduler, shared between the main loop
//! and interrupt handlers, so it lives behind the central critical-section
//! abstraction. Callbacks run *outside* the critical section: dispatch is
//! two-phase (select under the lock, run unlocked, complete under the lock),
//! which is what lets a long callback call [`yield_now`] as a cooperative
//! sleep without deadlocking or being re-entered.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU8, Ordering};
use critical_section::Mutex;

use axis_core::{
    ClockFn, Period, Priority, SchedResult, TaskCallback, TaskHandle, TimingMode, PRIORITY_LEVELS,
};
use axis_hal::TimerChannel;

use crate::registry::{Dispatch, Scheduler, Selection};
use crate::TASKS_MAX;

#[cfg(feature = "profile")]
use crate::profiler::TaskProfile;

fn clock_unset() -> u64 {
    0
}

static SCHEDULER: Mutex<RefCell<Scheduler<TASKS_MAX>>> =
    Mutex::new(RefCell::new(Scheduler::new(clock_unset)));

/// Floor value meaning "no callback is executing"
const FLOOR_OPEN: u8 = PRIORITY_LEVELS as u8;

/// Priority level of the callback currently executing, if any. Nested
/// [`yield_now`] calls may only dispatch strictly above this level.
static ACTIVE_FLOOR: AtomicU8 = AtomicU8::new(FLOOR_OPEN);

/// Get access to the global scheduler
pub fn with_scheduler<F, R>(f: F) -> R
where
    F: FnOnce(&mut Scheduler<TASKS_MAX>) -> R,
{
    critical_section::with(|cs| {
        let mut scheduler = SCHEDULER.borrow_ref_mut(cs);
        f(&mut scheduler)
    })
}

/// Install the platform's monotonic microsecond clock. Must run before any
/// task is added.
pub fn init(clock: ClockFn) {
    with_scheduler(|s| s.set_clock(clock));
}

/// Register a platform timer channel with the global scheduler
pub fn register_channel(channel: &'static dyn TimerChannel) -> SchedResult<u8> {
    with_scheduler(|s| s.register_channel(channel))
}

/// Create a task; see [`Scheduler::add`]
pub fn add(
    period: Period,
    duration_ms: u32,
    repeat: bool,
    priority: u8,
    callback: TaskCallback,
    name: &str,
) -> SchedResult<TaskHandle> {
    let priority = Priority::new(priority)?;
    with_scheduler(|s| s.add(period, duration_ms, repeat, priority, callback, name))
}

pub fn remove(handle: TaskHandle) -> SchedResult<()> {
    // disarm outside the critical section: the host channel joins its timer
    // thread, and that thread's callback may itself be using this API
    let channel = with_scheduler(|s| s.release(handle))?;
    if let Some(channel) = channel {
        channel.disarm();
    }
    Ok(())
}

pub fn request_hardware_timer(handle: TaskHandle, hw_priority: u8) -> SchedResult<()> {
    with_scheduler(|s| s.request_hardware_timer(handle, hw_priority))
}

/// Period change in milliseconds
pub fn set_period(handle: TaskHandle, millis: u32) -> SchedResult<()> {
    with_scheduler(|s| s.set_period(handle, Period::millis(millis)))
}

/// Period change in microseconds
pub fn set_period_micros(handle: TaskHandle, micros: u32) -> SchedResult<()> {
    with_scheduler(|s| s.set_period(handle, Period::micros(micros)))
}

/// Period change in sub-microseconds (1/16 µs)
pub fn set_period_sub_micros(handle: TaskHandle, sub_micros: u32) -> SchedResult<()> {
    with_scheduler(|s| s.set_period(handle, Period::sub_micros(sub_micros)))
}

/// Period change expressed as a frequency
pub fn set_frequency(handle: TaskHandle, hz: f32) -> SchedResult<()> {
    with_scheduler(|s| s.set_frequency(handle, hz))
}

pub fn set_duration(handle: TaskHandle, duration_ms: u32) -> SchedResult<()> {
    with_scheduler(|s| s.set_duration(handle, duration_ms))
}

pub fn set_duration_complete(handle: TaskHandle) -> SchedResult<()> {
    with_scheduler(|s| s.set_duration_complete(handle))
}

pub fn set_repeat(handle: TaskHandle, repeat: bool) -> SchedResult<()> {
    with_scheduler(|s| s.set_repeat(handle, repeat))
}

pub fn set_priority(handle: TaskHandle, priority: u8) -> SchedResult<()> {
    let priority = Priority::new(priority)?;
    with_scheduler(|s| s.set_priority(handle, priority))
}

pub fn set_timing_mode(handle: TaskHandle, mode: TimingMode) -> SchedResult<()> {
    with_scheduler(|s| s.set_timing_mode(handle, mode))
}

pub fn get_handle_by_name(name: &str) -> Option<TaskHandle> {
    with_scheduler(|s| s.get_handle_by_name(name))
}

pub fn first_handle() -> Option<TaskHandle> {
    with_scheduler(|s| s.first_handle())
}

pub fn next_handle(handle: TaskHandle) -> Option<TaskHandle> {
    with_scheduler(|s| s.next_handle(handle))
}

pub fn task_count() -> usize {
    with_scheduler(|s| s.task_count())
}

/// Consume-on-read profiling snapshot for one task
#[cfg(feature = "profile")]
pub fn take_profile(handle: TaskHandle) -> SchedResult<TaskProfile> {
    with_scheduler(|s| s.take_profile(handle))
}

/// Run at most one due task and return.
///
/// Called from inside a running callback this only dispatches tasks at a
/// strictly more urgent level than the caller, so peers at the caller's own
/// or a lower level cannot re-enter it.
pub fn yield_now() -> Dispatch {
    let floor = active_floor();
    match with_scheduler(|s| s.select_above(floor)) {
        Selection::Run(run) => {
            let previous = ACTIVE_FLOOR.swap(run.level.raw(), Ordering::Relaxed);
            let start = (run.clock)();
            run.callback.invoke();
            let end = (run.clock)();
            ACTIVE_FLOOR.store(previous, Ordering::Relaxed);
            with_scheduler(|s| s.complete(run.handle, start, end));
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

/// Busy-wait for `millis`, dispatching all the while
pub fn yield_for_millis(millis: u64) {
    yield_for_micros(millis * 1_000);
}

/// Busy-wait for `micros`, dispatching all the while
pub fn yield_for_micros(micros: u64) {
    let clock = with_scheduler(|s| s.clock());
    let deadline = clock() + micros;
    loop {
        yield_now();
        if clock() >= deadline {
            break;
        }
    }
}

fn active_floor() -> Option<Priority> {
    let floor = ACTIVE_FLOOR.load(Ordering::Relaxed);
    if floor >= FLOOR_OPEN {
        None
    } else {
        Some(Priority::new_unchecked(floor))
    }
}
