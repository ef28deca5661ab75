//! Per-image resolution outcomes and their cached form.

use serde::{Deserialize, Serialize};

/// Terminal state of a single image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageOutcome {
    /// The image loaded successfully.
    Proper,
    /// The image failed to load, or was forced broken by the timeout.
    Broken,
}

impl ImageOutcome {
    /// Maps a broken flag onto an outcome.
    #[must_use]
    pub const fn from_broken(is_broken: bool) -> Self {
        if is_broken {
            Self::Broken
        } else {
            Self::Proper
        }
    }

    /// Returns true for [`ImageOutcome::Broken`].
    #[must_use]
    pub const fn is_broken(self) -> bool {
        matches!(self, Self::Broken)
    }
}

/// Last known outcome of a handle, keyed by the `src` it was resolved with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Resolution outcome.
    pub outcome: ImageOutcome,
    /// Resource identifier the handle had when it resolved.
    pub src: String,
}

impl CacheRecord {
    /// Creates a record.
    #[must_use]
    pub fn new(outcome: ImageOutcome, src: impl Into<String>) -> Self {
        Self {
            outcome,
            src: src.into(),
        }
    }

    /// Whether the record still applies to a handle currently pointing at `src`.
    #[must_use]
    pub fn matches(&self, src: &str) -> bool {
        self.src == src
    }

    /// Returns the cached broken flag.
    #[must_use]
    pub const fn is_broken(&self) -> bool {
        self.outcome.is_broken()
    }
}
