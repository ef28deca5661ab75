//! Session status and snapshot types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::NodeId;

/// Lifecycle state of a tracking session.
///
/// Moves from `Pending` to exactly one terminal state, once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Some images have not resolved yet.
    #[default]
    Pending,
    /// Every image loaded properly.
    Done,
    /// At least one image is broken.
    Failed,
}

impl SessionStatus {
    /// Whether the session has resolved.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Point-in-time snapshot of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    /// Session status at snapshot time.
    pub status: SessionStatus,
    /// Every watched image, in collection order.
    pub images: Vec<NodeId>,
    /// Resolved images, in resolution order.
    pub loaded: Vec<NodeId>,
    /// Images still waiting for an outcome.
    pub pending: Vec<NodeId>,
    /// Images that loaded properly, in resolution order.
    pub proper: Vec<NodeId>,
    /// Broken images, in resolution order.
    pub broken: Vec<NodeId>,
}

/// Options for a single tracking call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackOptions {
    /// Time after which still-pending images are forced broken.
    pub timeout: Duration,
}

impl TrackOptions {
    /// Timeout applied when none is configured.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

    /// Returns options with the given timeout.
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TrackOptions {
    fn default() -> Self {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }
}
