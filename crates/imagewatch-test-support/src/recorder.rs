//! Session event recorder.

use std::cell::RefCell;
use std::rc::Rc;

use imagewatch_core::{ImageOutcome, NodeId, Session};

/// One callback invocation observed on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A progress callback fired.
    Progress {
        /// The resolved image.
        image: NodeId,
        /// Its outcome.
        outcome: ImageOutcome,
    },
    /// The done callback fired.
    Done,
    /// The fail callback fired.
    Fail,
    /// The always callback fired.
    Always,
}

/// Captures every event fired on the sessions it observes.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Rc<RefCell<Vec<SessionEvent>>>,
}

impl Recorder {
    /// Creates a recorder that observes nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a recorder registered on all four channels of `session`.
    #[must_use]
    pub fn attach(session: &Session) -> Self {
        let recorder = Self::new();
        recorder.observe(session);
        recorder
    }

    /// Registers on all four channels of `session`.
    pub fn observe(&self, session: &Session) {
        let (progress, done, fail, always) = (
            Rc::clone(&self.events),
            Rc::clone(&self.events),
            Rc::clone(&self.events),
            Rc::clone(&self.events),
        );
        session
            .progress(move |_, image, outcome| {
                progress
                    .borrow_mut()
                    .push(SessionEvent::Progress { image, outcome });
            })
            .done(move |_| done.borrow_mut().push(SessionEvent::Done))
            .fail(move |_| fail.borrow_mut().push(SessionEvent::Fail))
            .always(move |_| always.borrow_mut().push(SessionEvent::Always));
    }

    /// All events, in the order they fired.
    #[must_use]
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.borrow().clone()
    }

    /// Progress events as `(image, outcome)` pairs.
    #[must_use]
    pub fn progress(&self) -> Vec<(NodeId, ImageOutcome)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match *e {
                SessionEvent::Progress { image, outcome } => Some((image, outcome)),
                _ => None,
            })
            .collect()
    }

    /// Number of progress events.
    #[must_use]
    pub fn progress_count(&self) -> usize {
        self.progress().len()
    }

    /// Number of times `event` fired.
    #[must_use]
    pub fn count(&self, event: SessionEvent) -> usize {
        self.events.borrow().iter().filter(|&&e| e == event).count()
    }
}
