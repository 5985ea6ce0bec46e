//! Terminal progress reporting for concurrent transfers.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Byte-level template for transfer bars.
const TRANSFER_TEMPLATE: &str =
    "{msg:40!} {bar:30} {bytes}/{total_bytes} ({bytes_per_sec}, eta {eta})";

/// Shared progress UI for all concurrent transfers.
///
/// Cloning is cheap; the underlying `MultiProgress` is reference-counted.
/// In quiet mode every bar is hidden and the pipeline behaves identically,
/// just silently.
#[derive(Debug, Clone)]
pub struct Progress {
    multi: MultiProgress,
    enabled: bool,
}

impl Progress {
    /// Creates the progress UI; `quiet` hides all bars.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            enabled: !quiet,
        }
    }

    /// Adds a byte-progress bar for one transfer.
    ///
    /// `position` pre-fills the bar with the resume offset so a resumed
    /// transfer shows its true completion.
    #[must_use]
    pub fn transfer_bar(&self, label: &str, total: u64, position: u64) -> ProgressBar {
        let bar = if self.enabled {
            let bar = self.multi.add(ProgressBar::new(total));
            bar.set_style(
                ProgressStyle::with_template(TRANSFER_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        } else {
            let bar = ProgressBar::hidden();
            bar.set_length(total);
            bar
        };
        bar.set_message(label.to_string());
        bar.set_position(position);
        bar
    }
}
