//! Tracking session: per-image resolution, aggregation and completion.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace, warn};

use super::channels::{CompletionCallback, EventChannels, ProgressCallback};
use super::probe::Probe;
use super::Ports;
use crate::domain::{ImageOutcome, NodeId, SessionReport, SessionStatus, TrackOptions};
use crate::ports::{ProbeListener, ProbeSignal, TimerId};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// How an image reached its outcome.
#[derive(Debug, Clone, Copy)]
enum Resolution {
    Cache,
    Complete,
    Probe,
    Timeout,
}

/// Terminal channels a callback can be registered on.
#[derive(Debug, Clone, Copy)]
enum Terminal {
    Done,
    Fail,
    Always,
}

struct SessionState {
    status: SessionStatus,
    images: Vec<NodeId>,
    pending: Vec<NodeId>,
    resolved: Vec<(NodeId, ImageOutcome)>,
    proper: Vec<NodeId>,
    broken: Vec<NodeId>,
    timer: Option<TimerId>,
    probes: HashMap<NodeId, Probe>,
}

impl SessionState {
    fn new(images: Vec<NodeId>) -> Self {
        Self {
            status: SessionStatus::Pending,
            pending: images.clone(),
            images,
            resolved: Vec::new(),
            proper: Vec::new(),
            broken: Vec::new(),
            timer: None,
            probes: HashMap::new(),
        }
    }
}

struct Inner {
    id: u64,
    ports: Ports,
    state: RefCell<SessionState>,
    channels: RefCell<EventChannels>,
}

/// Handle to one tracking call.
///
/// Clones refer to the same session. Callbacks receive the session they
/// were registered on, so they can read its snapshot fields.
#[derive(Clone)]
pub struct Session {
    inner: Rc<Inner>,
}

impl Session {
    /// Creates the session, defers the scan by one tick and arms the timeout.
    pub(crate) fn start(ports: Ports, images: Vec<NodeId>, options: &TrackOptions) -> Self {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            session = id,
            images = images.len(),
            timeout_ms = u64::try_from(options.timeout.as_millis()).unwrap_or(u64::MAX),
            "tracking started"
        );

        let session = Self {
            inner: Rc::new(Inner {
                id,
                ports,
                state: RefCell::new(SessionState::new(images)),
                channels: RefCell::new(EventChannels::default()),
            }),
        };

        let scheduler = Rc::clone(&session.inner.ports.scheduler);
        let scan = session.clone();
        scheduler.post(Box::new(move || scan.scan()));
        let terminate = session.clone();
        let timer = scheduler.set_timeout(options.timeout, Box::new(move || terminate.terminate()));
        session.inner.state.borrow_mut().timer = Some(timer);

        session
    }

    /// Identifier used to correlate log lines.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Registers `callback` for successful completion, or runs it now if the
    /// session already finished with every image proper.
    pub fn done(&self, callback: impl FnOnce(&Self) + 'static) -> &Self {
        self.on_terminal(Terminal::Done, Box::new(callback))
    }

    /// Registers `callback` for failed completion, or runs it now if the
    /// session already finished with a broken image.
    pub fn fail(&self, callback: impl FnOnce(&Self) + 'static) -> &Self {
        self.on_terminal(Terminal::Fail, Box::new(callback))
    }

    /// Registers `callback` for completion of either kind, or runs it now if
    /// the session already finished.
    pub fn always(&self, callback: impl FnOnce(&Self) + 'static) -> &Self {
        self.on_terminal(Terminal::Always, Box::new(callback))
    }

    /// Registers `callback` for every future image resolution, then replays
    /// it for each image resolved so far, in resolution order.
    pub fn progress(&self, callback: impl Fn(&Self, NodeId, ImageOutcome) + 'static) -> &Self {
        let callback: ProgressCallback = Rc::new(callback);
        if self.is_pending() {
            self.inner
                .channels
                .borrow_mut()
                .on_progress(Rc::clone(&callback));
        }
        let replay = self.inner.state.borrow().resolved.clone();
        for (image, outcome) in replay {
            callback(self, image, outcome);
        }
        self
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.inner.state.borrow().status
    }

    /// Whether the session has not resolved yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status() == SessionStatus::Pending
    }

    /// Whether the session resolved with every image proper.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.status() == SessionStatus::Done
    }

    /// Whether the session resolved with at least one broken image.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status() == SessionStatus::Failed
    }

    /// Every watched image, in collection order.
    #[must_use]
    pub fn images(&self) -> Vec<NodeId> {
        self.inner.state.borrow().images.clone()
    }

    /// Resolved images, in resolution order.
    #[must_use]
    pub fn loaded(&self) -> Vec<NodeId> {
        self.inner
            .state
            .borrow()
            .resolved
            .iter()
            .map(|&(image, _)| image)
            .collect()
    }

    /// Images still waiting for an outcome.
    #[must_use]
    pub fn pending(&self) -> Vec<NodeId> {
        self.inner.state.borrow().pending.clone()
    }

    /// Images that loaded properly, in resolution order.
    #[must_use]
    pub fn proper(&self) -> Vec<NodeId> {
        self.inner.state.borrow().proper.clone()
    }

    /// Broken images, in resolution order.
    #[must_use]
    pub fn broken(&self) -> Vec<NodeId> {
        self.inner.state.borrow().broken.clone()
    }

    /// Outcome of `image` in this session, if it has resolved.
    #[must_use]
    pub fn outcome_of(&self, image: NodeId) -> Option<ImageOutcome> {
        self.inner
            .state
            .borrow()
            .resolved
            .iter()
            .find(|&&(resolved, _)| resolved == image)
            .map(|&(_, outcome)| outcome)
    }

    /// Snapshot of every list and the status.
    #[must_use]
    pub fn report(&self) -> SessionReport {
        let state = self.inner.state.borrow();
        SessionReport {
            status: state.status,
            images: state.images.clone(),
            loaded: state.resolved.iter().map(|&(image, _)| image).collect(),
            pending: state.pending.clone(),
            proper: state.proper.clone(),
            broken: state.broken.clone(),
        }
    }

    fn on_terminal(&self, channel: Terminal, callback: CompletionCallback) -> &Self {
        match (self.status(), channel) {
            (SessionStatus::Pending, Terminal::Done) => {
                self.inner.channels.borrow_mut().on_done(callback);
            }
            (SessionStatus::Pending, Terminal::Fail) => {
                self.inner.channels.borrow_mut().on_fail(callback);
            }
            (SessionStatus::Pending, Terminal::Always) => {
                self.inner.channels.borrow_mut().on_always(callback);
            }
            (SessionStatus::Done, Terminal::Done | Terminal::Always)
            | (SessionStatus::Failed, Terminal::Fail | Terminal::Always) => callback(self),
            (SessionStatus::Done, Terminal::Fail) | (SessionStatus::Failed, Terminal::Done) => {}
        }
        self
    }

    fn is_image_pending(&self, image: NodeId) -> bool {
        self.inner.state.borrow().pending.contains(&image)
    }

    /// One pass over the images: cache, then readiness, then a probe.
    fn scan(&self) {
        let images = self.images();
        if images.is_empty() {
            self.finish();
            return;
        }

        let ports = &self.inner.ports;
        for image in images {
            if !self.is_image_pending(image) {
                continue;
            }
            let src = ports.document.src(image);
            if let Some(outcome) = ports.cache.lookup(image, &src) {
                self.resolve(image, outcome, Resolution::Cache);
            } else if let Some(outcome) = ports.document.readiness(image).outcome() {
                self.resolve(image, outcome, Resolution::Complete);
            } else {
                self.arm_probe(image, &src);
            }
        }
    }

    fn arm_probe(&self, image: NodeId, src: &str) {
        let session = Rc::downgrade(&self.inner);
        let listener: ProbeListener = Box::new(move |signal| {
            if let Some(inner) = session.upgrade() {
                Self { inner }.on_probe_signal(image, signal);
            }
        });
        let probe = Probe::attach(Rc::clone(&self.inner.ports.loader), src, listener);

        // The host may have signalled from inside `attach`.
        let stale = {
            let mut state = self.inner.state.borrow_mut();
            if state.pending.contains(&image) {
                state.probes.insert(image, probe)
            } else {
                Some(probe)
            }
        };
        drop(stale);
    }

    fn on_probe_signal(&self, image: NodeId, signal: ProbeSignal) {
        let probe = self.inner.state.borrow_mut().probes.remove(&image);
        drop(probe);
        self.resolve(image, signal.outcome(), Resolution::Probe);
    }

    /// Moves `image` from pending to loaded and notifies progress listeners.
    fn resolve(&self, image: NodeId, outcome: ImageOutcome, via: Resolution) {
        let (probe, complete) = {
            let mut state = self.inner.state.borrow_mut();
            let Some(index) = state.pending.iter().position(|&p| p == image) else {
                return;
            };
            state.pending.remove(index);
            state.resolved.push((image, outcome));
            match outcome {
                ImageOutcome::Proper => state.proper.push(image),
                ImageOutcome::Broken => state.broken.push(image),
            }
            let complete = state.resolved.len() == state.images.len();
            (state.probes.remove(&image), complete)
        };
        drop(probe);

        let src = self.inner.ports.document.src(image);
        trace!(session = self.inner.id, %image, ?outcome, ?via, %src, "image resolved");
        self.inner.ports.cache.record(image, outcome, src);

        let listeners = self.inner.channels.borrow().progress();
        for listener in listeners {
            listener(self, image, outcome);
        }

        if complete {
            let session = self.clone();
            self.inner
                .ports
                .scheduler
                .post(Box::new(move || session.finish()));
        }
    }

    /// Settles the status and fires `done` or `fail`, then `always`.
    fn finish(&self) {
        let (status, timer, probes, proper, broken) = {
            let mut state = self.inner.state.borrow_mut();
            if state.status.is_terminal() {
                return;
            }
            state.status = if state.proper.len() == state.images.len() {
                SessionStatus::Done
            } else {
                SessionStatus::Failed
            };
            (
                state.status,
                state.timer.take(),
                std::mem::take(&mut state.probes),
                state.proper.len(),
                state.broken.len(),
            )
        };
        drop(probes);
        if let Some(timer) = timer {
            self.inner.ports.scheduler.clear_timeout(timer);
        }
        debug!(session = self.inner.id, ?status, proper, broken, "tracking finished");

        let (outcome, always) = self.inner.channels.borrow_mut().take_terminal(status);
        for callback in outcome {
            callback(self);
        }
        for callback in always {
            callback(self);
        }
    }

    /// Forces every still-pending image broken.
    fn terminate(&self) {
        let forced = {
            let mut state = self.inner.state.borrow_mut();
            state.timer = None;
            state.pending.clone()
        };
        if forced.is_empty() {
            return;
        }
        warn!(
            session = self.inner.id,
            pending = forced.len(),
            "timeout elapsed, forcing pending images broken"
        );
        for image in forced {
            self.resolve(image, ImageOutcome::Broken, Resolution::Timeout);
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("status", &state.status)
            .field("images", &state.images.len())
            .field("pending", &state.pending.len())
            .field("proper", &state.proper.len())
            .field("broken", &state.broken.len())
            .finish()
    }
}
