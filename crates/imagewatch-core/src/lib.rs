//! Imagewatch Core - Image load tracking
//!
//! This crate contains the domain types, the ports a host implements, the
//! image collector and the load tracker that decides when a set of images
//! has finished loading.
//!
//! ```ignore
//! let tracker = Tracker::new(document, loader, scheduler);
//! tracker
//!     .track(gallery)
//!     .progress(|_, image, outcome| println!("{image}: {outcome:?}"))
//!     .done(|session| println!("{} images loaded", session.images().len()))
//!     .fail(|session| println!("{} broken", session.broken().len()));
//! ```

pub mod collector;
pub mod domain;
pub mod ports;
pub mod tracker;

pub use collector::{collect_images, Collection};
pub use domain::{
    CacheRecord, ImageOutcome, NodeId, NodeKind, Readiness, SessionReport, SessionStatus,
    TrackOptions,
};
pub use ports::{
    Document, ProbeListener, ProbeSignal, ProxyLoader, ProxyToken, Scheduler, Task, TimerId,
};
pub use tracker::{CacheTable, Session, Tracker};
