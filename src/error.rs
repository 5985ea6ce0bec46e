//! Error types shared across the download pipeline.
//!
//! Per-video and per-folder failures are represented by [`Error`] and are
//! caught at the narrowest boundary (around a single video or folder call),
//! logged once, and counted. [`UsageError`] covers pre-flight validation
//! problems that abort the run before any transfer work starts.

use std::path::PathBuf;

use thiserror::Error;

use crate::fetch::FetchError;

/// Errors local to one video or one folder.
///
/// None of these abort the batch; the orchestrator catches them around the
/// failing item, logs one line naming the URL and reason, and moves on.
#[derive(Debug, Error)]
pub enum Error {
    /// Expected page structure was absent (site layout changed).
    #[error("failed to parse {what} for {url}, skipping")]
    Parser {
        /// The missing node, e.g. `"video title"` or `"media player"`.
        what: &'static str,
        /// The page URL that was being parsed.
        url: String,
    },

    /// The video is only available to logged-in premium users.
    #[error("{title} is only available to premium users, skipping")]
    LoginRequired {
        /// Video title as shown on the page.
        title: String,
    },

    /// The video is not available in the client's region.
    #[error("{url} is not available in your country, skipping")]
    GeoBlocked {
        /// The blocked video URL.
        url: String,
    },

    /// The requested resolution is not offered for this video.
    #[error("{requested} resolution is not available for {url}")]
    Resolution {
        /// The resolution label the user asked for.
        requested: String,
        /// The video URL it was requested for.
        url: String,
    },

    /// Transport-level failure (non-2xx status, network, timeout).
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// File system error while creating directories or writing media.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A URL reached a pipeline stage it should never have been routed to.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL string.
        url: String,
    },
}

impl Error {
    /// Creates a parse failure naming the missing node.
    pub fn parser(what: &'static str, url: impl Into<String>) -> Self {
        Self::Parser {
            what,
            url: url.into(),
        }
    }

    /// Creates an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the HTTP status code if this is a transport status error.
    ///
    /// Used by the video pipeline to single out 429 responses, which get a
    /// long backoff and a full pipeline retry instead of a failure count.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Fetch(FetchError::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

/// Pre-flight validation failures.
///
/// These abort the whole run before any transfer work begins and map to a
/// non-zero exit code.
#[derive(Debug, Error)]
pub enum UsageError {
    /// The configured transfer limit must be positive, never clamped.
    #[error("invalid thread count {value}: must be greater than 0")]
    InvalidThreadCount {
        /// The rejected value.
        value: usize,
    },

    /// `--resolution` only applies to video URLs.
    #[error("the -r/--resolution flag is only available for videos, {url} is a folder")]
    ResolutionFlagOnFolder {
        /// The folder URL that was combined with the flag.
        url: String,
    },

    /// `--resolutions` only applies to video URLs.
    #[error("the -R/--resolutions flag is only available for videos, {url} is a folder")]
    ListFlagOnFolder {
        /// The folder URL that was combined with the flag.
        url: String,
    },

    /// A URL matched neither the video nor the folder shape in a strict mode.
    #[error("unrecognized URL: {url}")]
    UnrecognizedUrl {
        /// The unrecognized URL string.
        url: String,
    },
}
