//! Hardware-invocation instrumentation
//!
//! An armed channel fires its callback from interrupt context, far away from
//! the cooperative bookkeeping in the task record. Arming therefore
//! substitutes a per-channel shim that timestamps the real callback and
//! accumulates runtimes here; [`crate::Scheduler::take_profile`] drains the
//! channel accumulator for hardware-bound tasks. Interrupt invocations have
//! no cooperative boundary, so no jitter is recorded.

use core::cell::RefCell;
use critical_section::Mutex;

use axis_core::{ClockFn, TaskCallback};
use axis_hal::MAX_CHANNELS;

use crate::profiler::{TaskProfile, TaskStats};

struct Channel {
    callback: Option<TaskCallback>,
    clock: Option<ClockFn>,
    stats: TaskStats,
}

impl Channel {
    const fn idle() -> Self {
        Channel {
            callback: None,
            clock: None,
            stats: TaskStats::new(),
        }
    }
}

static CHANNELS: [Mutex<RefCell<Channel>>; MAX_CHANNELS] =
    [const { Mutex::new(RefCell::new(Channel::idle())) }; MAX_CHANNELS];

// one monomorphic shim per channel slot
const _: () = assert!(MAX_CHANNELS == 4);

static SHIMS: [TaskCallback; MAX_CHANNELS] = [
    TaskCallback::Function(shim0),
    TaskCallback::Function(shim1),
    TaskCallback::Function(shim2),
    TaskCallback::Function(shim3),
];

/// Install `callback` behind channel `index`'s shim and reset the
/// accumulator. Returns the shim to hand to the hardware.
pub(crate) fn bind(index: usize, callback: TaskCallback, clock: ClockFn) -> TaskCallback {
    critical_section::with(|cs| {
        let mut channel = CHANNELS[index].borrow_ref_mut(cs);
        channel.callback = Some(callback);
        channel.clock = Some(clock);
        channel.stats = TaskStats::new();
    });
    SHIMS[index]
}

/// Detach channel `index`; subsequent shim ticks are no-ops
pub(crate) fn unbind(index: usize) {
    critical_section::with(|cs| {
        *CHANNELS[index].borrow_ref_mut(cs) = Channel::idle();
    });
}

/// Consume-on-read snapshot of channel `index`'s accumulator
pub(crate) fn take(index: usize) -> TaskProfile {
    critical_section::with(|cs| CHANNELS[index].borrow_ref_mut(cs).stats.take())
}

fn tick(index: usize) {
    let bound = critical_section::with(|cs| {
        let channel = CHANNELS[index].borrow_ref(cs);
        channel.callback.zip(channel.clock)
    });
    let Some((callback, clock)) = bound else {
        return;
    };
    let start = clock();
    callback.invoke();
    let end = clock();
    critical_section::with(|cs| {
        CHANNELS[index]
            .borrow_ref_mut(cs)
            .stats
            .record(end.saturating_sub(start), None);
    });
}

fn shim0() {
    tick(0);
}

fn shim1() {
    tick(1);
}

fn shim2() {
    tick(2);
}

fn shim3() {
    tick(3);
}
