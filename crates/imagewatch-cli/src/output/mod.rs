//! Output formatting for CLI.

mod json;
mod progress;

use clap::ValueEnum;
use imagewatch_core::{ImageOutcome, SessionStatus};
use serde::Serialize;

pub use json::JsonOutput;
pub use progress::ProgressBar;

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON Lines (one JSON object per line)
    #[default]
    Jsonl,
    /// Single JSON object
    Json,
}

impl OutputFormat {
    /// Parses the config file spelling of a format.
    pub fn from_config(value: &str) -> Option<Self> {
        match value {
            "json" => Some(Self::Json),
            "jsonl" => Some(Self::Jsonl),
            _ => None,
        }
    }
}

/// One resolved image.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
    /// Position of the image in collection order.
    pub index: usize,
    /// File the image was loaded from.
    pub src: String,
    /// How the image resolved.
    pub outcome: ImageOutcome,
}

/// Totals written once the session resolves.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub status: SessionStatus,
    pub total: usize,
    pub proper: usize,
    pub broken: usize,
    pub timestamp: String,
    /// Sources of the broken images, in resolution order.
    pub broken_sources: Vec<String>,
}
