//! Task callback model
//!
//! Callbacks take no arguments and return nothing; any state they touch is
//! their own (`'static`) responsibility. The enum keeps plain function
//! pointers `Copy`-cheap while still admitting static closures.

use core::fmt;

/// The work function registered with a task slot
#[derive(Clone, Copy)]
pub enum TaskCallback {
    /// Plain function, no captured state
    Function(fn()),
    /// Static closure (e.g. a driver singleton's method shim)
    Closure(&'static (dyn Fn() + Sync)),
}

impl TaskCallback {
    /// Run the callback synchronously in the caller's context
    #[inline]
    pub fn invoke(&self) {
        match self {
            TaskCallback::Function(f) => f(),
            TaskCallback::Closure(f) => f(),
        }
    }
}

impl From<fn()> for TaskCallback {
    fn from(f: fn()) -> Self {
        TaskCallback::Function(f)
    }
}

impl fmt::Debug for TaskCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskCallback::Function(p) => write!(f, "Function({:p})", *p as *const ()),
            TaskCallback::Closure(_) => write!(f, "Closure"),
        }
    }
}
