//! Shared run context handed to every video and folder task.

use std::sync::Arc;

use crate::fetch::Fetcher;
use crate::options::{DownloadOptions, DownloadState};
use crate::progress::Progress;

/// Everything a task needs from its surroundings, passed explicitly into
/// each constructor rather than read from ambient globals.
///
/// Cloning shares the same HTTP client, options (including the concurrency
/// limiter), counters, and progress UI.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// HTTP client wrapper, shared read-only across tasks.
    pub fetcher: Fetcher,
    /// Per-run configuration and the shared transfer limiter.
    pub options: Arc<DownloadOptions>,
    /// Terminal-outcome counters for the run.
    pub state: Arc<DownloadState>,
    /// Progress UI for concurrent transfers.
    pub progress: Progress,
}

impl RunContext {
    /// Builds a context with a fresh default fetcher.
    #[must_use]
    pub fn new(options: DownloadOptions) -> Self {
        Self::with_fetcher(options, Fetcher::new())
    }

    /// Builds a context around an existing fetcher.
    ///
    /// Integration tests use this with a base-override fetcher pointed at a
    /// mock server.
    #[must_use]
    pub fn with_fetcher(options: DownloadOptions, fetcher: Fetcher) -> Self {
        let quiet = options.quiet;
        Self {
            fetcher,
            options: Arc::new(options),
            state: Arc::new(DownloadState::new()),
            progress: Progress::new(quiet),
        }
    }
}
