//! Proxy loader that decodes image files off the main thread.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use image::GenericImageView;
use imagewatch_core::{ProbeListener, ProbeSignal, ProxyLoader, ProxyToken};
use tracing::{debug, trace, warn};

use crate::fs::is_raw_image;

/// Source of I/O completions the event loop waits on.
pub trait IoSource {
    /// Waits up to `timeout` (forever when `None`) for completions and
    /// delivers every one available. Returns how many were delivered.
    fn poll(&self, timeout: Option<Duration>) -> usize;

    /// Number of attached requests whose completion is still due.
    fn outstanding(&self) -> usize;
}

type Completion = (u64, ProbeSignal);
type Job = (u64, PathBuf);

/// State shared between the owning thread and the workers.
#[derive(Default)]
struct Shared {
    /// Tokens still attached; queued jobs for anything else are skipped.
    live: Mutex<HashSet<u64>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl Shared {
    fn is_live(&self, token: u64) -> bool {
        self.live.lock().map_or(true, |live| live.contains(&token))
    }

    fn set_live(&self, token: u64, live: bool) {
        if let Ok(mut tokens) = self.live.lock() {
            if live {
                tokens.insert(token);
            } else {
                tokens.remove(&token);
            }
        }
    }
}

/// Number of decode workers used by [`DecodeLoader::new`].
#[must_use]
pub fn default_workers() -> NonZeroUsize {
    thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

/// Decodes each attached `src` as a file path on a bounded worker pool.
///
/// Workers are spawned on demand up to the pool size and pull requests
/// from a shared queue. Signals are delivered by [`IoSource::poll`] on the
/// thread that owns the loader. A probe detached before its worker picks it
/// up is never decoded, and one detached mid-decode never hears about it.
pub struct DecodeLoader {
    next_token: Cell<u64>,
    listeners: RefCell<HashMap<u64, ProbeListener>>,
    limit: usize,
    spawned: Cell<usize>,
    shared: Arc<Shared>,
    jobs: Sender<Job>,
    queue: Arc<Mutex<Receiver<Job>>>,
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
}

impl DecodeLoader {
    /// Creates a loader sized to the available parallelism.
    #[must_use]
    pub fn new() -> Self {
        Self::with_workers(default_workers())
    }

    /// Creates a loader that decodes at most `workers` files at once.
    #[must_use]
    pub fn with_workers(workers: NonZeroUsize) -> Self {
        let (jobs, queue) = mpsc::channel();
        let (sender, receiver) = mpsc::channel();
        Self {
            next_token: Cell::new(1),
            listeners: RefCell::new(HashMap::new()),
            limit: workers.get(),
            spawned: Cell::new(0),
            shared: Arc::new(Shared::default()),
            jobs,
            queue: Arc::new(Mutex::new(queue)),
            sender,
            receiver,
        }
    }

    /// Number of worker threads started so far.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.spawned.get()
    }

    /// Highest number of decodes that ran at the same time.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.shared.peak.load(Ordering::SeqCst)
    }

    fn ensure_worker(&self) {
        let spawned = self.spawned.get();
        if spawned >= self.limit || spawned >= self.listeners.borrow().len() {
            return;
        }

        let queue = Arc::clone(&self.queue);
        let shared = Arc::clone(&self.shared);
        let sender = self.sender.clone();
        let started = thread::Builder::new()
            .name(format!("imagewatch-decode-{spawned}"))
            .spawn(move || work(&queue, &shared, &sender));
        match started {
            Ok(_) => self.spawned.set(spawned + 1),
            Err(e) => warn!("Failed to start decode worker: {e}"),
        }
    }

    fn deliver(&self, (token, signal): Completion) -> bool {
        let listener = self.listeners.borrow_mut().remove(&token);
        let Some(mut listener) = listener else {
            trace!(token, ?signal, "dropping signal for detached probe");
            return false;
        };
        self.shared.set_live(token, false);
        listener(signal);
        true
    }
}

impl Default for DecodeLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyLoader for DecodeLoader {
    fn attach(&self, src: &str, listener: ProbeListener) -> ProxyToken {
        let token = self.next_token.get();
        self.next_token.set(token + 1);
        self.listeners.borrow_mut().insert(token, listener);
        self.shared.set_live(token, true);

        if self.jobs.send((token, PathBuf::from(src))).is_err() {
            warn!("Decode queue closed, {src} will not be probed");
        }
        self.ensure_worker();

        ProxyToken::new(token)
    }

    fn detach(&self, token: ProxyToken) {
        self.listeners.borrow_mut().remove(&token.get());
        self.shared.set_live(token.get(), false);
    }
}

/// Worker loop: runs until the loader drops its end of the queue.
fn work(queue: &Mutex<Receiver<Job>>, shared: &Shared, sender: &Sender<Completion>) {
    loop {
        let job = match queue.lock() {
            Ok(jobs) => jobs.recv(),
            Err(_) => return,
        };
        let Ok((token, path)) = job else {
            return;
        };
        if !shared.is_live(token) {
            trace!(token, "skipping detached probe");
            continue;
        }

        let running = shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        shared.peak.fetch_max(running, Ordering::SeqCst);
        let signal = match decode_dimensions(&path) {
            Ok((width, height)) => {
                trace!("Decoded {} ({width}x{height})", path.display());
                ProbeSignal::Load
            }
            Err(e) => {
                debug!("{e:#}");
                ProbeSignal::Error
            }
        };
        shared.in_flight.fetch_sub(1, Ordering::SeqCst);

        if sender.send((token, signal)).is_err() {
            return;
        }
    }
}

impl IoSource for DecodeLoader {
    fn poll(&self, timeout: Option<Duration>) -> usize {
        let first = match timeout {
            Some(timeout) => match self.receiver.recv_timeout(timeout) {
                Ok(completion) => completion,
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return 0,
            },
            None => match self.receiver.recv() {
                Ok(completion) => completion,
                Err(_) => return 0,
            },
        };

        let mut delivered = usize::from(self.deliver(first));
        while let Ok(completion) = self.receiver.try_recv() {
            delivered += usize::from(self.deliver(completion));
        }
        delivered
    }

    fn outstanding(&self) -> usize {
        self.listeners.borrow().len()
    }
}

/// Decodes `path` fully and returns its dimensions.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded, or decodes to
/// an empty image.
pub fn decode_dimensions(path: &Path) -> Result<(u32, u32)> {
    let (width, height) = if is_raw_image(path) {
        let raw = rawloader::decode_file(path)
            .with_context(|| format!("Failed to decode RAW: {}", path.display()))?;
        (
            u32::try_from(raw.width).unwrap_or(u32::MAX),
            u32::try_from(raw.height).unwrap_or(u32::MAX),
        )
    } else {
        image::open(path)
            .with_context(|| format!("Failed to open image: {}", path.display()))?
            .dimensions()
    };

    if width == 0 || height == 0 {
        bail!("Image has no pixels: {}", path.display());
    }
    Ok((width, height))
}
