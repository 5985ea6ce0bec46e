//! HTTP fetcher with bounded retry and User-Agent rotation.
//!
//! Every network call in the pipeline goes through [`Fetcher::get`]. Non-2xx
//! responses become [`FetchError::Status`] carrying the status code, and only
//! that error class is retried: fixed one-second backoff, at most three
//! attempts, within a five-second total budget, whichever limit is reached
//! first. Callers must not wrap their own retry loop around the same error
//! class; rate-limit (429) handling with its long backoff lives in the video
//! pipeline instead.

mod agent;

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

/// Maximum attempts per call, including the first.
const MAX_ATTEMPTS: u32 = 3;

/// Fixed delay between attempts.
const RETRY_WAIT: Duration = Duration::from_secs(1);

/// Total wall-clock budget per call; no retry starts past this.
const RETRY_BUDGET: Duration = Duration::from_secs(5);

/// Connect timeout for the underlying client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-read timeout; long enough for slow media chunks.
const READ_TIMEOUT: Duration = Duration::from_secs(300);

/// Errors produced by the fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-2xx status.
    #[error("HTTP error [{status}] for {url}, skipping")]
    Status {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Connection-level failure (DNS, TLS, refused, reset mid-body).
    #[error("network error for {url}: {source}")]
    Network {
        /// The requested URL.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The request did not complete within the client timeouts.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The requested URL.
        url: String,
    },
}

impl FetchError {
    /// Creates a status error.
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }
}

/// HTTP fetcher shared by every video and folder task.
///
/// Cloning is cheap: the underlying reqwest client is reference-counted and
/// has no mutable per-request state, so one fetcher is shared read-only
/// across all concurrent tasks.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    base_override: Option<String>,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    /// Creates a fetcher with the default client configuration.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            base_override: None,
        }
    }

    /// Creates a fetcher that routes every request to a fixed base URL,
    /// keeping the original path and query.
    ///
    /// Used to point the pipeline at a site mirror (and by integration
    /// tests at a local mock server) without touching URL classification.
    #[must_use]
    pub fn with_base_override(base: impl Into<String>) -> Self {
        let mut fetcher = Self::new();
        fetcher.base_override = Some(base.into());
        fetcher
    }

    /// Issues a GET request with a rotated User-Agent and bounded retry.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Status`] for non-2xx responses after retries
    /// are exhausted, [`FetchError::Network`]/[`FetchError::Timeout`] for
    /// transport failures (not retried).
    pub async fn get(&self, url: &str, headers: HeaderMap) -> Result<Response, FetchError> {
        let started = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.send(url, headers.clone()).await {
                Ok(response) => return Ok(response),
                Err(error @ FetchError::Status { .. }) => {
                    if attempt >= MAX_ATTEMPTS || started.elapsed() >= RETRY_BUDGET {
                        return Err(error);
                    }
                    warn!(url, attempt, error = %error, "retrying request");
                    tokio::time::sleep(RETRY_WAIT).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Issues a GET request and reads the full body as text.
    ///
    /// # Errors
    ///
    /// Same as [`Fetcher::get`], plus [`FetchError::Network`] if the body
    /// read fails mid-stream.
    pub async fn get_text(&self, url: &str, headers: HeaderMap) -> Result<String, FetchError> {
        let response = self.get(url, headers).await?;
        response
            .text()
            .await
            .map_err(|source| FetchError::network(url, source))
    }

    async fn send(&self, url: &str, mut headers: HeaderMap) -> Result<Response, FetchError> {
        let target = self.effective_url(url);
        headers.insert(USER_AGENT, HeaderValue::from_static(agent::random_agent()));

        let response = self
            .client
            .get(&target)
            .headers(headers)
            .send()
            .await
            .map_err(|source| {
                if source.is_timeout() {
                    FetchError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    FetchError::network(url, source)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            debug!(url, status = status.as_u16(), "non-success response");
            return Err(FetchError::status(url, status.as_u16()));
        }
        Ok(response)
    }

    /// Rewrites the request target when a base override is configured,
    /// keeping path and query intact. Errors keep the original URL so the
    /// failure stays attributable.
    fn effective_url(&self, url: &str) -> String {
        let Some(base) = &self.base_override else {
            return url.to_string();
        };
        let Ok(parsed) = Url::parse(url) else {
            return url.to_string();
        };
        let query = parsed
            .query()
            .map(|q| format!("?{q}"))
            .unwrap_or_default();
        format!("{}{}{query}", base.trim_end_matches('/'), parsed.path())
    }
}

/// Headers sent with every page (metadata) request.
#[must_use]
pub fn page_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        "X-Requested-With",
        HeaderValue::from_static("XMLHttpRequest"),
    );
    headers
}

/// Returns true when the status code is the site's rate-limit answer.
#[must_use]
pub fn is_rate_limited(status: u16) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS.as_u16()
}
