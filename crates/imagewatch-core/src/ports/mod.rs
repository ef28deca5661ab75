//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the tracker and the host.
//! Everything runs on one thread, so none of them require `Send`.

mod document;
mod loader;
mod scheduler;

pub use document::Document;
pub use loader::{ProbeListener, ProbeSignal, ProxyLoader, ProxyToken};
pub use scheduler::{Scheduler, Task, TimerId};
