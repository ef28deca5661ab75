//! Single-threaded event loop on the wall clock.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use imagewatch_core::{Scheduler, Task, TimerId};
use tracing::trace;

use crate::loader::IoSource;

/// Scheduler that runs tasks when their due time passes.
///
/// Tasks are ordered by due time, then by insertion. Posted tasks are due
/// immediately but still run only once control returns to the loop.
pub struct EventLoop {
    next_id: Cell<u64>,
    queue: RefCell<BTreeMap<(Instant, u64), Task>>,
}

impl EventLoop {
    /// Creates an empty loop.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            queue: RefCell::new(BTreeMap::new()),
        }
    }

    /// Number of queued tasks, armed timers included.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Runs every task whose due time has passed, including tasks they queue.
    pub fn run_due(&self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.pop_due(Instant::now()) {
            task();
            ran += 1;
        }
        ran
    }

    /// Drives tasks and I/O until `done` holds or nothing is left to wait for.
    ///
    /// Between tasks the loop blocks on `io` until the next timer is due.
    /// Returns whether `done` held on exit.
    pub fn run_until(&self, io: &dyn IoSource, done: impl Fn() -> bool) -> bool {
        loop {
            self.run_due();
            if done() {
                return true;
            }

            let next = self.next_due();
            if next.is_none() && io.outstanding() == 0 {
                trace!("event loop idle");
                return done();
            }

            let timeout = next.map(|due| due.saturating_duration_since(Instant::now()));
            io.poll(timeout);
        }
    }

    fn next_due(&self) -> Option<Instant> {
        self.queue.borrow().keys().next().map(|&(due, _)| due)
    }

    fn pop_due(&self, now: Instant) -> Option<Task> {
        let mut queue = self.queue.borrow_mut();
        let key = *queue.keys().next().filter(|&&(due, _)| due <= now)?;
        queue.remove(&key)
    }

    fn schedule(&self, delay: Duration, task: Task) -> TimerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.queue
            .borrow_mut()
            .insert((Instant::now() + delay, id), task);
        TimerId::new(id)
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for EventLoop {
    fn post(&self, task: Task) {
        self.schedule(Duration::ZERO, task);
    }

    fn set_timeout(&self, delay: Duration, task: Task) -> TimerId {
        self.schedule(delay, task)
    }

    fn clear_timeout(&self, timer: TimerId) {
        self.queue
            .borrow_mut()
            .retain(|&(_, id), _| id != timer.get());
    }
}
