//! Load tracker.
//!
//! A [`Tracker`] binds the host ports together with a shared cache
//! side-table and starts one [`Session`] per tracking call.

mod cache;
mod channels;
mod probe;
mod session;

use std::rc::Rc;

pub use cache::CacheTable;
pub use channels::{CompletionCallback, ProgressCallback};
pub use session::Session;

use crate::collector::{collect_images, Collection};
use crate::domain::{CacheRecord, NodeId, TrackOptions};
use crate::ports::{Document, ProxyLoader, Scheduler};

/// Host ports shared by every session of a tracker.
#[derive(Clone)]
pub(crate) struct Ports {
    pub(crate) document: Rc<dyn Document>,
    pub(crate) loader: Rc<dyn ProxyLoader>,
    pub(crate) scheduler: Rc<dyn Scheduler>,
    pub(crate) cache: CacheTable,
}

/// Entry point for tracking image loads.
pub struct Tracker {
    ports: Ports,
    options: TrackOptions,
}

impl Tracker {
    /// Creates a tracker with default options and an empty cache.
    #[must_use]
    pub fn new(
        document: Rc<dyn Document>,
        loader: Rc<dyn ProxyLoader>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        Self {
            ports: Ports {
                document,
                loader,
                scheduler,
                cache: CacheTable::new(),
            },
            options: TrackOptions::default(),
        }
    }

    /// Replaces the options used by [`Tracker::track`].
    #[must_use]
    pub const fn with_options(mut self, options: TrackOptions) -> Self {
        self.options = options;
        self
    }

    /// Shares an existing cache table instead of the tracker's own.
    #[must_use]
    pub fn with_cache(mut self, cache: CacheTable) -> Self {
        self.ports.cache = cache;
        self
    }

    /// Default options for new sessions.
    #[must_use]
    pub const fn options(&self) -> &TrackOptions {
        &self.options
    }

    /// Cache side-table shared by this tracker's sessions.
    #[must_use]
    pub const fn cache(&self) -> &CacheTable {
        &self.ports.cache
    }

    /// Drops the cached outcome of a node the host no longer holds.
    pub fn evict(&self, image: NodeId) -> Option<CacheRecord> {
        self.ports.cache.evict(image)
    }

    /// Starts tracking with the tracker's default options.
    pub fn track(&self, collection: impl Into<Collection>) -> Session {
        self.track_with(collection, &self.options)
    }

    /// Starts tracking with explicit options.
    ///
    /// Images are collected immediately; the scan runs on the next tick, so
    /// callbacks registered right after this returns see every event.
    pub fn track_with(&self, collection: impl Into<Collection>, options: &TrackOptions) -> Session {
        let images = collect_images(self.ports.document.as_ref(), &collection.into());
        Session::start(self.ports.clone(), images, options)
    }
}
