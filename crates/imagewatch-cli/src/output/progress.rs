//! Progress bar adapter using indicatif.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};

use super::{ImageRecord, Summary};

/// Progress bar adapter for CLI output.
pub struct ProgressBar {
    bar: Option<IndicatifBar>,
    quiet: bool,
}

impl ProgressBar {
    /// Creates a new progress bar.
    ///
    /// # Arguments
    ///
    /// * `total` - Number of images being tracked
    /// * `quiet` - If true, suppress all output
    /// * `show_bar` - If true, show progress bar; otherwise report broken images only
    #[must_use]
    pub fn new(total: u64, quiet: bool, show_bar: bool) -> Self {
        if quiet {
            return Self {
                bar: None,
                quiet: true,
            };
        }

        let bar = show_bar.then(|| {
            let bar = IndicatifBar::new(total);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        });

        Self { bar, quiet }
    }

    /// Advances past one resolved image.
    pub fn on_image(&self, record: &ImageRecord) {
        if self.quiet {
            return;
        }

        if let Some(bar) = &self.bar {
            bar.inc(1);
            bar.set_message(record.src.clone());
        } else if record.outcome.is_broken() {
            eprintln!("{}: broken", record.src);
        }
    }

    /// Closes the bar with the final totals.
    pub fn finish(&self, summary: &Summary) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(format!(
                "{:?}: {} proper, {} broken",
                summary.status, summary.proper, summary.broken
            ));
        }
    }
}
