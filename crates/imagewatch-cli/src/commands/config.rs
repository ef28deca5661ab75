//! Config command - print the effective configuration.

use anyhow::{Context, Result};

use crate::config::AppConfig;

/// Prints `config` with defaults filled in.
pub fn run(config: &AppConfig) -> Result<()> {
    let text = toml::to_string_pretty(&config.resolved())
        .context("Failed to serialize configuration")?;
    print!("{text}");
    Ok(())
}
