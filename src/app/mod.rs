//! Top-level download orchestration.
//!
//! The orchestrator splits input URLs into video and folder buckets, owns
//! the run context (and with it the global concurrency limiter), handles the
//! two metadata-only modes, and drives folder crawls and standalone video
//! downloads. Failures local to one URL never abort the iteration over the
//! rest; pre-flight usage errors abort before any transfer work starts.

use thiserror::Error;
use tracing::{info, warn};

use crate::context::RunContext;
use crate::error::{Error as DownloadError, UsageError};
use crate::folder::Folder;
use crate::options::DownloadOptions;
use crate::parser::{UrlKind, classify};
use crate::video::{Video, dispatch_videos};

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Pre-flight validation failed.
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// A metadata-only mode failed on one of its URLs.
    #[error(transparent)]
    Download(#[from] DownloadError),
}

/// Aggregate counts printed at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Videos downloaded to completion.
    pub completed: usize,
    /// Videos skipped because the file already existed.
    pub skipped: usize,
    /// Videos and folders that failed.
    pub failed: usize,
}

/// Top-level coordinator for one invocation.
pub struct Downloader {
    urls: Vec<String>,
    list_resolutions: bool,
    ctx: RunContext,
}

impl Downloader {
    /// Creates a downloader with a fresh default context.
    #[must_use]
    pub fn new(urls: Vec<String>, options: DownloadOptions, list_resolutions: bool) -> Self {
        Self::with_context(urls, list_resolutions, RunContext::new(options))
    }

    /// Creates a downloader around an existing context.
    ///
    /// Integration tests use this with a base-override fetcher.
    #[must_use]
    pub fn with_context(urls: Vec<String>, list_resolutions: bool, ctx: RunContext) -> Self {
        Self {
            urls: urls.into_iter().map(|url| url.trim().to_string()).collect(),
            list_resolutions,
            ctx,
        }
    }

    /// Runs the whole batch and returns the aggregate summary.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Usage`] for pre-flight validation failures
    /// (folder URLs combined with the resolution flags, unrecognized URLs in
    /// strict modes) and [`RunError::Download`] when a metadata-only mode
    /// fails. Per-video and per-folder failures during the normal download
    /// mode are logged and counted, never returned.
    pub async fn run(self) -> Result<RunSummary, RunError> {
        let mut video_urls = Vec::new();
        let mut folder_urls = Vec::new();
        let mut unrecognized = Vec::new();
        for url in &self.urls {
            match classify(url) {
                UrlKind::Video { .. } => video_urls.push(url.clone()),
                UrlKind::Folder { .. } => folder_urls.push(url.clone()),
                UrlKind::Unrecognized => unrecognized.push(url.clone()),
            }
        }

        if self.list_resolutions {
            self.list_all_resolutions(&video_urls, &folder_urls, &unrecognized)
                .await?;
            return Ok(self.summary());
        }

        if !self.ctx.options.wants_best() {
            self.validate_resolutions_up_front(&video_urls, &folder_urls, &unrecognized)
                .await?;
        }

        for url in &unrecognized {
            warn!(%url, "unrecognized URL");
            self.ctx.state.increment_failed();
        }

        // Folders first: their videos are already competing for the shared
        // limiter by the time standalone videos start.
        for url in &folder_urls {
            let mut folder = Folder::new(url, self.ctx.options.directory.clone(), self.ctx.clone());
            if let Err(error) = folder.download().await {
                warn!(%url, %error, "folder download failed");
                self.ctx.state.increment_failed();
            }
        }

        let videos = video_urls
            .into_iter()
            .map(|url| Video::new(url, self.ctx.options.directory.clone(), self.ctx.clone()))
            .collect();
        dispatch_videos(videos, std::sync::Arc::clone(&self.ctx.options.limiter)).await;

        let summary = self.summary();
        info!(
            completed = summary.completed,
            skipped = summary.skipped,
            failed = summary.failed,
            "finished downloading all files"
        );
        Ok(summary)
    }

    /// Prints the resolution list for every video URL, then ends the run
    /// without downloading anything.
    async fn list_all_resolutions(
        &self,
        video_urls: &[String],
        folder_urls: &[String],
        unrecognized: &[String],
    ) -> Result<(), RunError> {
        if let Some(url) = folder_urls.first() {
            return Err(UsageError::ListFlagOnFolder { url: url.clone() }.into());
        }
        if let Some(url) = unrecognized.first() {
            return Err(UsageError::UnrecognizedUrl { url: url.clone() }.into());
        }
        for url in video_urls {
            let video = Video::new(
                url.clone(),
                self.ctx.options.directory.clone(),
                self.ctx.clone(),
            );
            let resolutions = video.fetch_resolutions().await?;
            println!("Available resolutions for {url}:");
            for label in resolutions {
                println!("{label}");
            }
        }
        Ok(())
    }

    /// Checks the explicitly requested resolution against every video URL
    /// before any transfer work begins.
    async fn validate_resolutions_up_front(
        &self,
        video_urls: &[String],
        folder_urls: &[String],
        unrecognized: &[String],
    ) -> Result<(), RunError> {
        if let Some(url) = folder_urls.first() {
            return Err(UsageError::ResolutionFlagOnFolder { url: url.clone() }.into());
        }
        if let Some(url) = unrecognized.first() {
            return Err(UsageError::UnrecognizedUrl { url: url.clone() }.into());
        }
        for url in video_urls {
            let video = Video::new(
                url.clone(),
                self.ctx.options.directory.clone(),
                self.ctx.clone(),
            );
            video.validate_requested_resolution().await?;
        }
        Ok(())
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            completed: self.ctx.state.completed(),
            skipped: self.ctx.state.skipped(),
            failed: self.ctx.state.failed(),
        }
    }
}
