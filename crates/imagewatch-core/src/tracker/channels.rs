//! Fixed-shape event channels for a session.

use std::rc::Rc;

use super::Session;
use crate::domain::{ImageOutcome, NodeId, SessionStatus};

/// Callback fired once per resolved image.
pub type ProgressCallback = Rc<dyn Fn(&Session, NodeId, ImageOutcome)>;

/// Callback fired at most once, when the session resolves.
pub type CompletionCallback = Box<dyn FnOnce(&Session)>;

/// Registered callbacks, one list per channel, in registration order.
#[derive(Default)]
pub(crate) struct EventChannels {
    progress: Vec<ProgressCallback>,
    done: Vec<CompletionCallback>,
    fail: Vec<CompletionCallback>,
    always: Vec<CompletionCallback>,
}

impl EventChannels {
    pub(crate) fn on_progress(&mut self, callback: ProgressCallback) {
        self.progress.push(callback);
    }

    pub(crate) fn on_done(&mut self, callback: CompletionCallback) {
        self.done.push(callback);
    }

    pub(crate) fn on_fail(&mut self, callback: CompletionCallback) {
        self.fail.push(callback);
    }

    pub(crate) fn on_always(&mut self, callback: CompletionCallback) {
        self.always.push(callback);
    }

    /// Snapshot of the progress listeners for one dispatch.
    pub(crate) fn progress(&self) -> Vec<ProgressCallback> {
        self.progress.clone()
    }

    /// Empties every channel, returning the outcome callbacks matching
    /// `status` followed by the `always` callbacks.
    pub(crate) fn take_terminal(
        &mut self,
        status: SessionStatus,
    ) -> (Vec<CompletionCallback>, Vec<CompletionCallback>) {
        let done = std::mem::take(&mut self.done);
        let fail = std::mem::take(&mut self.fail);
        self.progress.clear();
        let outcome = match status {
            SessionStatus::Done => done,
            SessionStatus::Failed => fail,
            SessionStatus::Pending => Vec::new(),
        };
        (outcome, std::mem::take(&mut self.always))
    }
}
