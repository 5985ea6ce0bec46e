//! Run configuration and run-scoped counters.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;

use crate::error::UsageError;

/// Default number of concurrent transfers.
pub const DEFAULT_THREADS: usize = 3;

/// Sentinel resolution label meaning "highest available".
pub const BEST_RESOLUTION: &str = "best";

/// Immutable per-run configuration, shared by every video and folder task.
///
/// The concurrency limiter is the single piece of shared mutable state: a
/// counting semaphore sized by the configured thread count that gates how
/// many transfers run at once. Everything else is read-only after
/// construction.
#[derive(Debug)]
pub struct DownloadOptions {
    /// Destination directory for downloaded files.
    pub directory: PathBuf,
    /// Requested resolution label, or [`BEST_RESOLUTION`].
    pub resolution: String,
    /// Whether existing files are downloaded again.
    pub overwrite: bool,
    /// Whether progress bars and info logging are suppressed.
    pub quiet: bool,
    /// Gates concurrent transfers; shared by all tasks.
    pub limiter: Arc<Semaphore>,
    threads: usize,
}

impl DownloadOptions {
    /// Validates the configuration and builds the shared limiter.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::InvalidThreadCount`] when `threads` is zero.
    /// The value is never silently clamped.
    pub fn new(
        directory: PathBuf,
        resolution: impl Into<String>,
        overwrite: bool,
        threads: usize,
        quiet: bool,
    ) -> Result<Self, UsageError> {
        if threads == 0 {
            return Err(UsageError::InvalidThreadCount { value: threads });
        }
        Ok(Self {
            directory,
            resolution: resolution.into(),
            overwrite,
            quiet,
            limiter: Arc::new(Semaphore::new(threads)),
            threads,
        })
    }

    /// Returns the configured transfer limit.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Returns true when the run wants the highest available resolution.
    #[must_use]
    pub fn wants_best(&self) -> bool {
        self.resolution == BEST_RESOLUTION
    }
}

/// Terminal-outcome counters for one run.
///
/// Mutated by many concurrent tasks, so the counters are atomic. Created at
/// run start, read for the final summary, never persisted.
#[derive(Debug, Default)]
pub struct DownloadState {
    completed: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl DownloadState {
    /// Creates a state tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of videos downloaded to completion.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Returns the number of videos skipped because the file already existed.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Returns the number of videos that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Increments the completed counter.
    pub fn increment_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    /// Increments the skipped counter.
    pub fn increment_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    /// Increments the failed counter.
    pub fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}
