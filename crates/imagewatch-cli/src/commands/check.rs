//! Check command - track images until each has loaded or broken.

use std::collections::HashMap;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use imagewatch_adapters::{DecodeLoader, EventLoop, FsDocument};
use imagewatch_core::{Document, SessionStatus, TrackOptions, Tracker};
use tracing::{debug, info};

use super::ExitCode;
use crate::config::{defaults, AppConfig};
use crate::output::{ImageRecord, JsonOutput, OutputFormat, ProgressBar, Summary};

/// Parse and validate a timeout in milliseconds.
fn parse_timeout(s: &str) -> Result<u64, String> {
    let value: u64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number of milliseconds"))?;
    if value == 0 {
        Err("timeout must be at least 1 ms".to_string())
    } else {
        Ok(value)
    }
}

/// Shared arguments for load tracking.
#[derive(Args, Clone)]
pub struct CheckArgs {
    /// Files or directories to track
    pub paths: Vec<PathBuf>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Milliseconds before still-pending images are reported broken
    #[arg(long, value_name = "MS", value_parser = parse_timeout)]
    pub timeout: Option<u64>,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output (only affects --format json)
    #[arg(long)]
    pub pretty: bool,
}

impl CheckArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Hardcoded defaults (in accessor methods)
    /// 2. Config file values (XDG, then project-local)
    /// 3. CLI arguments (already set on self)
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        if !args.recursive {
            args.recursive = config.general.recursive.unwrap_or(defaults::RECURSIVE);
        }

        args.timeout = args
            .timeout
            .or(config.tracker.timeout_ms.filter(|&ms| ms > 0));

        if args.format.is_none() {
            args.format = config
                .output
                .format
                .as_deref()
                .and_then(OutputFormat::from_config);
        }

        if !args.pretty {
            args.pretty = config.output.pretty.unwrap_or(defaults::PRETTY);
        }
        if !args.progress {
            args.progress = config.output.progress.unwrap_or(defaults::PROGRESS);
        }

        args
    }

    /// Get the timeout with fallback to the hardcoded default.
    fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout.unwrap_or(defaults::TIMEOUT_MS))
    }

    /// Get output format with fallback to JSONL.
    fn format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }
}

/// Result of running the check command.
#[allow(dead_code)] // Fields exposed for programmatic use
pub struct CheckResult {
    /// Final session status.
    pub status: SessionStatus,
    /// Number of images tracked.
    pub total: usize,
    /// Number of broken images.
    pub broken: usize,
    /// Exit code.
    pub exit_code: ExitCode,
}

/// Run the check command.
///
/// Expects `args` to have been processed through `with_config()` first
/// to apply configuration file settings.
pub fn run(args: &CheckArgs) -> Result<CheckResult> {
    info!("Running check command on {} paths", args.paths.len());

    if args.paths.is_empty() {
        bail!("No paths specified");
    }

    let (document, roots) = FsDocument::scan(&args.paths, args.recursive);
    let document = Rc::new(document);
    let loader = Rc::new(DecodeLoader::new());
    let event_loop = Rc::new(EventLoop::new());
    let tracker = Tracker::new(document.clone(), loader.clone(), event_loop.clone())
        .with_options(TrackOptions::with_timeout(args.timeout()));

    let session = tracker.track(roots);
    let images = session.images();
    debug!("Tracking {} images", images.len());

    let show_progress = !args.quiet && (args.progress || std::io::stderr().is_terminal());
    let progress = Rc::new(ProgressBar::new(
        bar_length(images.len()),
        args.quiet,
        show_progress,
    ));
    let output = Rc::new(JsonOutput::stdout(args.format(), args.pretty));

    let index: HashMap<_, _> = images
        .iter()
        .enumerate()
        .map(|(position, &image)| (image, position))
        .collect();
    {
        let (document, progress, output) =
            (Rc::clone(&document), Rc::clone(&progress), Rc::clone(&output));
        session.progress(move |_, image, outcome| {
            let record = ImageRecord {
                index: index.get(&image).copied().unwrap_or_default(),
                src: document.src(image),
                outcome,
            };
            progress.on_image(&record);
            output.image(record);
        });
    }
    session
        .done(|s| info!("All {} images loaded", s.images().len()))
        .fail(|s| info!("{} of {} images broken", s.broken().len(), s.images().len()));

    let watched = session.clone();
    if !event_loop.run_until(&*loader, move || !watched.is_pending()) {
        bail!("Tracking stopped before every image resolved");
    }

    let report = session.report();
    let summary = Summary {
        status: report.status,
        total: report.images.len(),
        proper: report.proper.len(),
        broken: report.broken.len(),
        timestamp: iso_timestamp(),
        broken_sources: report.broken.iter().map(|&image| document.src(image)).collect(),
    };
    progress.finish(&summary);
    output.finish(&summary)?;

    let exit_code = match report.status {
        SessionStatus::Done => ExitCode::Success,
        _ => ExitCode::Failed,
    };

    Ok(CheckResult {
        status: report.status,
        total: summary.total,
        broken: summary.broken,
        exit_code,
    })
}

/// Progress bar length for `count` images, saturating on overflow.
fn bar_length(count: usize) -> u64 {
    u64::try_from(count).unwrap_or(u64::MAX)
}

/// Generate ISO 8601 UTC timestamp (RFC 3339 format).
fn iso_timestamp() -> String {
    match time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339) {
        Ok(ts) => ts,
        Err(e) => {
            debug!("Timestamp format failed: {e}");
            String::from("1970-01-01T00:00:00Z")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args(paths: &[&str]) -> CheckArgs {
        CheckArgs {
            paths: paths.iter().map(PathBuf::from).collect(),
            recursive: false,
            timeout: None,
            progress: false,
            quiet: true,
            format: None,
            pretty: false,
        }
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("250"), Ok(250));
        assert!(parse_timeout("0").is_err());
        assert!(parse_timeout("-1").is_err());
        assert!(parse_timeout("soon").is_err());
    }

    #[test]
    fn test_defaults_without_config() {
        let args = CheckArgs::with_config(args(&["a.png"]), &AppConfig::default());

        assert!(!args.recursive);
        assert_eq!(args.timeout(), Duration::from_secs(10));
        assert_eq!(args.format(), OutputFormat::Jsonl);
    }

    #[test]
    fn test_config_fills_unset_flags() {
        let config: AppConfig = toml::from_str(
            r"
[general]
recursive = true

[tracker]
timeout_ms = 750

[output]
format = 'json'
pretty = true
",
        )
        .unwrap();
        let args = CheckArgs::with_config(args(&["a.png"]), &config);

        assert!(args.recursive);
        assert_eq!(args.timeout(), Duration::from_millis(750));
        assert_eq!(args.format(), OutputFormat::Json);
        assert!(args.pretty);
    }

    #[test]
    fn test_cli_flags_win_over_config() {
        let config: AppConfig = toml::from_str(
            r"
[tracker]
timeout_ms = 750

[output]
format = 'json'
",
        )
        .unwrap();
        let mut cli = args(&["a.png"]);
        cli.timeout = Some(20);
        cli.format = Some(OutputFormat::Jsonl);
        let args = CheckArgs::with_config(cli, &config);

        assert_eq!(args.timeout(), Duration::from_millis(20));
        assert_eq!(args.format(), OutputFormat::Jsonl);
    }

    #[test]
    fn test_invalid_config_values_ignored() {
        let mut config = AppConfig::default();
        config.tracker.timeout_ms = Some(0);
        config.output.format = Some("xml".to_string());
        let args = CheckArgs::with_config(args(&["a.png"]), &config);

        assert_eq!(args.timeout(), Duration::from_secs(10));
        assert_eq!(args.format(), OutputFormat::Jsonl);
    }

    #[test]
    fn test_bar_length() {
        assert_eq!(bar_length(0), 0);
        assert_eq!(bar_length(300), 300);
    }

    #[test]
    fn test_run_requires_paths() {
        assert!(run(&args(&[])).is_err());
    }
}
