//! Mock implementations of core port traits.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use imagewatch_core::ports::{
    Document, ProbeListener, ProbeSignal, ProxyLoader, ProxyToken, Scheduler, Task, TimerId,
};
use imagewatch_core::{NodeId, NodeKind, Readiness};
use tracing::warn;

struct MockNode {
    kind: NodeKind,
    children: Vec<NodeId>,
    src: String,
    readiness: Readiness,
}

/// In-memory document tree.
///
/// Node ids are arena indices. The root document node is created up front;
/// fragments and detached images have no parent.
pub struct MockDocument {
    nodes: RefCell<Vec<MockNode>>,
}

impl MockDocument {
    /// Creates a document holding only its root node.
    #[must_use]
    pub fn new() -> Self {
        let doc = Self {
            nodes: RefCell::new(Vec::new()),
        };
        doc.push(None, NodeKind::Document, "");
        doc
    }

    /// Returns the root document node.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    /// Appends an element under `parent`.
    pub fn element(&self, parent: NodeId) -> NodeId {
        self.push(Some(parent), NodeKind::Element, "")
    }

    /// Appends an image under `parent`.
    pub fn image(&self, parent: NodeId, src: &str) -> NodeId {
        self.push(Some(parent), NodeKind::Image, src)
    }

    /// Appends a text node under `parent`.
    pub fn text(&self, parent: NodeId) -> NodeId {
        self.push(Some(parent), NodeKind::Text, "")
    }

    /// Appends a comment node under `parent`.
    pub fn comment(&self, parent: NodeId) -> NodeId {
        self.push(Some(parent), NodeKind::Comment, "")
    }

    /// Creates a detached document fragment.
    pub fn fragment(&self) -> NodeId {
        self.push(None, NodeKind::Fragment, "")
    }

    /// Creates an image outside the tree.
    pub fn detached_image(&self, src: &str) -> NodeId {
        self.push(None, NodeKind::Image, src)
    }

    /// Points an image at a new resource.
    pub fn set_src(&self, image: NodeId, src: &str) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(index(image)) {
            node.src = src.to_string();
        }
    }

    /// Changes the synchronous readiness of an image.
    pub fn set_readiness(&self, image: NodeId, readiness: Readiness) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(index(image)) {
            node.readiness = readiness;
        }
    }

    /// Direct children of `node`.
    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(index(node))
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn push(&self, parent: Option<NodeId>, kind: NodeKind, src: &str) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId::new(u64::try_from(nodes.len()).unwrap_or(u64::MAX));
        nodes.push(MockNode {
            kind,
            children: Vec::new(),
            src: src.to_string(),
            readiness: Readiness::Unsupported,
        });
        if let Some(parent) = parent.and_then(|p| nodes.get_mut(index(p))) {
            parent.children.push(id);
        }
        id
    }

    fn collect(nodes: &[MockNode], node: NodeId, out: &mut Vec<NodeId>) {
        let Some(entry) = nodes.get(index(node)) else {
            return;
        };
        for &child in &entry.children {
            if nodes.get(index(child)).is_some_and(|c| c.kind == NodeKind::Image) {
                out.push(child);
            }
            Self::collect(nodes, child, out);
        }
    }
}

impl Default for MockDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl Document for MockDocument {
    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.borrow().get(index(node)).map(|n| n.kind)
    }

    fn descendant_images(&self, node: NodeId) -> Vec<NodeId> {
        let mut images = Vec::new();
        Self::collect(&self.nodes.borrow(), node, &mut images);
        images
    }

    fn src(&self, image: NodeId) -> String {
        self.nodes
            .borrow()
            .get(index(image))
            .map(|n| n.src.clone())
            .unwrap_or_default()
    }

    fn readiness(&self, image: NodeId) -> Readiness {
        self.nodes
            .borrow()
            .get(index(image))
            .map_or(Readiness::Unsupported, |n| n.readiness)
    }
}

fn index(node: NodeId) -> usize {
    usize::try_from(node.get()).unwrap_or(usize::MAX)
}

struct ProxyEntry {
    src: String,
    listener: Option<ProbeListener>,
}

/// Mock implementation of `ProxyLoader` for testing.
///
/// Proxies stay attached until a test settles them, so tests decide exactly
/// when and how each probe resolves. Attach and detach calls are counted.
pub struct ManualLoader {
    next_token: Cell<u64>,
    proxies: RefCell<BTreeMap<u64, ProxyEntry>>,
    history: RefCell<Vec<String>>,
    detached: Cell<usize>,
    scripted: RefCell<HashMap<String, ProbeSignal>>,
}

impl ManualLoader {
    /// Creates a loader with no attached proxies.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_token: Cell::new(1),
            proxies: RefCell::new(BTreeMap::new()),
            history: RefCell::new(Vec::new()),
            detached: Cell::new(0),
            scripted: RefCell::new(HashMap::new()),
        }
    }

    /// Number of proxies ever attached.
    #[must_use]
    pub fn attach_count(&self) -> usize {
        self.history.borrow().len()
    }

    /// Number of proxies detached.
    #[must_use]
    pub fn detach_count(&self) -> usize {
        self.detached.get()
    }

    /// Number of proxies currently attached.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.proxies.borrow().len()
    }

    /// Sources of the currently attached proxies, in attach order.
    #[must_use]
    pub fn active_srcs(&self) -> Vec<String> {
        self.proxies
            .borrow()
            .values()
            .map(|entry| entry.src.clone())
            .collect()
    }

    /// Sources of every proxy ever attached, in attach order.
    #[must_use]
    pub fn attached_srcs(&self) -> Vec<String> {
        self.history.borrow().clone()
    }

    /// Fires `signal` on every attached proxy loading `src`.
    pub fn settle(&self, src: &str, signal: ProbeSignal) -> usize {
        let tokens: Vec<u64> = self
            .proxies
            .borrow()
            .iter()
            .filter(|(_, entry)| entry.src == src)
            .map(|(&token, _)| token)
            .collect();
        tokens
            .into_iter()
            .filter(|&token| self.fire(token, signal))
            .count()
    }

    /// Fires `signal` on every attached proxy.
    pub fn settle_all(&self, signal: ProbeSignal) -> usize {
        let tokens: Vec<u64> = self.proxies.borrow().keys().copied().collect();
        tokens
            .into_iter()
            .filter(|&token| self.fire(token, signal))
            .count()
    }

    /// Records the signal [`ManualLoader::deliver_scripted`] sends for `src`.
    pub fn script(&self, src: &str, signal: ProbeSignal) {
        self.scripted.borrow_mut().insert(src.to_string(), signal);
    }

    /// Settles every attached proxy that has a scripted signal.
    pub fn deliver_scripted(&self) -> usize {
        let due: Vec<(u64, ProbeSignal)> = {
            let scripted = self.scripted.borrow();
            self.proxies
                .borrow()
                .iter()
                .filter_map(|(&token, entry)| scripted.get(&entry.src).map(|&s| (token, s)))
                .collect()
        };
        due.into_iter()
            .filter(|&(token, signal)| self.fire(token, signal))
            .count()
    }

    fn fire(&self, token: u64, signal: ProbeSignal) -> bool {
        let listener = self
            .proxies
            .borrow_mut()
            .get_mut(&token)
            .and_then(|entry| entry.listener.take());
        let Some(mut listener) = listener else {
            return false;
        };
        listener(signal);
        // The listener usually detaches its own proxy.
        if let Some(entry) = self.proxies.borrow_mut().get_mut(&token) {
            entry.listener = Some(listener);
        }
        true
    }
}

impl Default for ManualLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyLoader for ManualLoader {
    fn attach(&self, src: &str, listener: ProbeListener) -> ProxyToken {
        let token = self.next_token.get();
        self.next_token.set(token + 1);
        self.proxies.borrow_mut().insert(
            token,
            ProxyEntry {
                src: src.to_string(),
                listener: Some(listener),
            },
        );
        self.history.borrow_mut().push(src.to_string());
        ProxyToken::new(token)
    }

    fn detach(&self, token: ProxyToken) {
        if self.proxies.borrow_mut().remove(&token.get()).is_some() {
            self.detached.set(self.detached.get() + 1);
        }
    }
}

struct ScheduledTask {
    id: u64,
    due: Duration,
    order: u64,
    task: Task,
}

/// Deterministic scheduler on a virtual clock.
///
/// Posted tasks are zero-delay timers. Tasks run in (due time, insertion
/// order) and only when the test drives the clock.
pub struct VirtualScheduler {
    now: Cell<Duration>,
    next_id: Cell<u64>,
    queue: RefCell<Vec<ScheduledTask>>,
    step_limit: usize,
}

impl VirtualScheduler {
    /// Creates a scheduler at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            next_id: Cell::new(1),
            queue: RefCell::new(Vec::new()),
            step_limit: 10_000,
        }
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Number of queued tasks, including armed timers.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Due times of the queued tasks, soonest first.
    #[must_use]
    pub fn pending_due_times(&self) -> Vec<Duration> {
        let mut due: Vec<Duration> = self.queue.borrow().iter().map(|t| t.due).collect();
        due.sort();
        due
    }

    /// Runs the tasks that are due now and were queued before this call.
    pub fn tick(&self) -> usize {
        let now = self.now.get();
        let batch: Vec<u64> = {
            let mut due: Vec<(u64, u64)> = self
                .queue
                .borrow()
                .iter()
                .filter(|t| t.due <= now)
                .map(|t| (t.order, t.id))
                .collect();
            due.sort_unstable();
            due.into_iter().map(|(_, id)| id).collect()
        };
        let mut ran = 0;
        for id in batch {
            let entry = {
                let mut queue = self.queue.borrow_mut();
                queue
                    .iter()
                    .position(|t| t.id == id)
                    .map(|i| queue.remove(i))
            };
            if let Some(entry) = entry {
                (entry.task)();
                ran += 1;
            }
        }
        ran
    }

    /// Runs every task due now, including ones queued while running.
    pub fn run_ready(&self) -> usize {
        self.run_until(Some(self.now.get()))
    }

    /// Moves the clock forward by `delta`, running timers as they fall due.
    pub fn advance(&self, delta: Duration) -> usize {
        let target = self.now.get() + delta;
        let ran = self.run_until(Some(target));
        self.now.set(target);
        ran + self.run_ready()
    }

    /// Runs everything, jumping the clock to each due time.
    pub fn flush(&self) -> usize {
        self.run_until(None)
    }

    fn run_until(&self, limit: Option<Duration>) -> usize {
        let mut steps = 0;
        while let Some(entry) = self.pop_next(limit) {
            steps += 1;
            if steps > self.step_limit {
                warn!(limit = self.step_limit, "virtual scheduler step limit reached");
                break;
            }
            if entry.due > self.now.get() {
                self.now.set(entry.due);
            }
            (entry.task)();
        }
        steps
    }

    fn pop_next(&self, limit: Option<Duration>) -> Option<ScheduledTask> {
        let mut queue = self.queue.borrow_mut();
        let next = queue
            .iter()
            .enumerate()
            .filter(|(_, t)| limit.map_or(true, |l| t.due <= l))
            .min_by_key(|(_, t)| (t.due, t.order))
            .map(|(i, _)| i)?;
        Some(queue.remove(next))
    }

    fn schedule(&self, delay: Duration, task: Task) -> TimerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.queue.borrow_mut().push(ScheduledTask {
            id,
            due: self.now.get() + delay,
            order: id,
            task,
        });
        TimerId::new(id)
    }
}

impl Default for VirtualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for VirtualScheduler {
    fn post(&self, task: Task) {
        self.schedule(Duration::ZERO, task);
    }

    fn set_timeout(&self, delay: Duration, task: Task) -> TimerId {
        self.schedule(delay, task)
    }

    fn clear_timeout(&self, timer: TimerId) {
        self.queue.borrow_mut().retain(|t| t.id != timer.get());
    }
}
