//! CLI command definitions and handlers.

pub mod check;
pub mod config;

use clap::{Parser, Subcommand};

/// Imagewatch - Report when a set of images has finished loading
#[derive(Parser)]
#[command(name = "imagewatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Shared check arguments (paths, timeout, output flags).
    #[command(flatten)]
    pub check: check::CheckArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Track images until every one has loaded or broken
    Check(check::CheckArgs),
    /// Print the effective configuration as TOML
    Config,
}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Every image loaded properly.
    Success = 0,
    /// At least one image is broken.
    Failed = 1,
    /// Usage or runtime error.
    Error = 2,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}
