//! Core domain types for image load tracking.

mod node;
mod outcome;
mod session;

pub use node::{NodeId, NodeKind, Readiness};
pub use outcome::{CacheRecord, ImageOutcome};
pub use session::{SessionReport, SessionStatus, TrackOptions};
