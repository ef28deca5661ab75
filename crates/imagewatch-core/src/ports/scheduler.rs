//! Scheduler port for deferred continuations and timers.

use std::time::Duration;

/// A continuation run by the host event loop.
pub type Task = Box<dyn FnOnce()>;

/// Host-issued identity of an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl TimerId {
    /// Wraps a raw host identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw host identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Port onto the host's single-threaded event loop.
pub trait Scheduler {
    /// Queues `task` for the next tick. Never runs it synchronously.
    fn post(&self, task: Task);

    /// Runs `task` once `delay` has elapsed.
    fn set_timeout(&self, delay: Duration, task: Task) -> TimerId;

    /// Cancels a timer. Fired or unknown timers are ignored.
    fn clear_timeout(&self, timer: TimerId);
}
