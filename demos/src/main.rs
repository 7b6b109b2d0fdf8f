//! Simulated mount controller on the POSIX port
//!
//! Wires the tasking engine the way the firmware does: a hardware-timer
//! task standing in for axis step generation, cooperative tasks for command
//! polling and status, and the period-ratio monitor picking up a simulated
//! pulse-per-second drift measurement.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use axis_core::{set_period_ratio_sub_micros, Period, TaskCallback};
use axis_posix::ThreadTimerChannel;
use axis_sched::{global, monitor};

static STEPS: AtomicU64 = AtomicU64::new(0);
static COMMANDS: AtomicU64 = AtomicU64::new(0);
static STOP: AtomicBool = AtomicBool::new(false);

static CHANNEL1: ThreadTimerChannel = ThreadTimerChannel::new();

fn step_axis1() {
    STEPS.fetch_add(1, Ordering::Relaxed);
}

fn poll_commands() {
    COMMANDS.fetch_add(1, Ordering::Relaxed);
}

fn print_status() {
    println!(
        "steps={} commands={}",
        STEPS.load(Ordering::Relaxed),
        COMMANDS.load(Ordering::Relaxed)
    );
}

fn main() {
    axis_posix::init();
    global::register_channel(&CHANNEL1).expect("channel registration");

    let stepper = global::add(
        Period::micros(5_000),
        0,
        true,
        0,
        TaskCallback::Function(step_axis1),
        "stepAxis1",
    )
    .expect("add stepper");
    global::request_hardware_timer(stepper, 0).expect("bind hardware timer");

    global::add(
        Period::millis(20),
        0,
        true,
        3,
        TaskCallback::Function(poll_commands),
        "cmdPoll",
    )
    .expect("add command poller");

    let status = global::add(
        Period::millis(500),
        0,
        true,
        6,
        TaskCallback::Function(print_status),
        "status",
    )
    .expect("add status");

    monitor::start_ratio_monitor(1_000).expect("add ratio monitor");

    // pretend a GPS PPS measured the host crystal 0.05% fast
    set_period_ratio_sub_micros(16_008_000);

    ctrlc::set_handler(|| STOP.store(true, Ordering::Relaxed)).expect("ctrl-c handler");
    println!("running; ctrl-c to stop");

    while !STOP.load(Ordering::Relaxed) {
        global::yield_now();
    }

    global::remove(stepper).expect("remove stepper");

    if let Ok(profile) = global::take_profile(status) {
        println!(
            "status task: {} runs, {} us total, {} us worst jitter",
            profile.invocations, profile.total_runtime_us, profile.worst_jitter_us
        );
    }
}
