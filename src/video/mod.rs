//! Per-video resolution and transfer pipeline.
//!
//! A video moves through two initialization phases: a cheap one that learns
//! the title and target path (enough for the skip-if-exists check), then the
//! full one that enumerates resolutions, decrypts the stream location, and
//! opens a ranged byte stream. The expensive stream request never fires for
//! files that are already on disk.
//!
//! Failures are terminal for the one video only: they are logged once and
//! counted, never propagated to sibling downloads. The single exception is
//! HTTP 429, which is absorbed with a long backoff and a full pipeline
//! retry.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use futures_util::StreamExt;
use reqwest::header::{HeaderValue, RANGE};
use scraper::Selector;
use serde::Deserialize;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Semaphore;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::context::RunContext;
use crate::error::Error;
use crate::fetch::{is_rate_limited, page_headers};
use crate::options::BEST_RESOLUTION;
use crate::page::{Document, element_text};
use crate::parser::{sanitize, video_id};
use crate::stream::decrypt_stream_url;

/// Transfer buffer size: one mebibyte per disk write.
const STREAM_CHUNK_SIZE: usize = 1024 * 1024;

/// Backoff applied when the site answers 429 before the pipeline retries.
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(60 * 10);

/// Page text marking premium-only videos.
const PREMIUM_PHRASE: &str = "Ten film jest dostępny dla użytkowników premium";

/// Page text marking geoblocked videos; the site sometimes joins the words
/// with a non-breaking space entity.
#[allow(clippy::expect_used)]
static GEOBLOCK_PATTERN: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"niedostępn[ey] w(?:&nbsp;|\s+)Twoim kraju")
        .expect("geoblock regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h1").expect("title selector is valid") // Static selector, safe to panic
});

/// The `player_data` JSON blob embedded in the media player element.
#[derive(Debug, Deserialize)]
struct PlayerData {
    video: PlayerVideo,
}

#[derive(Debug, Deserialize)]
struct PlayerVideo {
    /// Quality label -> encoded variant, in site order (ascending quality).
    qualities: serde_json::Map<String, serde_json::Value>,
    /// Obfuscated media-location token.
    file: String,
}

/// Resolution labels and the stream token extracted from one video page.
#[derive(Debug)]
struct PlayerMetadata {
    qualities: Vec<String>,
    file: String,
}

/// One discovered video and the context it downloads under.
#[derive(Debug, Clone)]
pub struct Video {
    url: String,
    directory: PathBuf,
    ctx: RunContext,
}

impl Video {
    /// Creates a video task targeting `directory`.
    #[must_use]
    pub fn new(url: impl Into<String>, directory: PathBuf, ctx: RunContext) -> Self {
        Self {
            url: url.into(),
            directory,
            ctx,
        }
    }

    /// Returns the source page URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Runs the full pipeline, absorbing its own failures.
    ///
    /// Every terminal outcome is logged and counted here; errors never reach
    /// sibling downloads. A 429 answer sleeps for [`RATE_LIMIT_BACKOFF`] and
    /// restarts the pipeline from scratch.
    pub async fn download(self) {
        loop {
            match self.try_download().await {
                Ok(()) => return,
                Err(error) if error.http_status().is_some_and(is_rate_limited) => {
                    warn!(
                        url = %self.url,
                        "too many requests, sleeping for 10 minutes before retrying"
                    );
                    tokio::time::sleep(RATE_LIMIT_BACKOFF).await;
                }
                Err(error) => {
                    warn!(url = %self.url, error = %error, "video download failed");
                    self.ctx.state.increment_failed();
                    return;
                }
            }
        }
    }

    /// Fetches only the metadata needed to enumerate resolution labels.
    ///
    /// Used by the list-resolutions mode; no transfer work happens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parser`] when the page lacks the player metadata,
    /// or a transport error from the page fetch.
    pub async fn fetch_resolutions(&self) -> Result<Vec<String>, Error> {
        let id = self.id()?;
        let page = self.fetch_page().await?;
        let metadata = parse_player_metadata(&page, &id, &self.url)?;
        Ok(metadata.qualities)
    }

    /// Verifies that the configured resolution is offered for this video.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] when the label is not offered, or any
    /// error from the metadata fetch.
    pub async fn validate_requested_resolution(&self) -> Result<(), Error> {
        let resolutions = self.fetch_resolutions().await?;
        select_resolution(&self.ctx.options.resolution, &resolutions, &self.url)?;
        Ok(())
    }

    /// One full pass of the pipeline: metadata, checks, resolution, stream.
    async fn try_download(&self) -> Result<(), Error> {
        let page = self.fetch_page().await?;

        // Phase one: enough to know where the file would land.
        let title = parse_title(&page, &self.url)?;
        let filepath = self.directory.join(format!("{title}.mp4"));
        if filepath.exists() && !self.ctx.options.overwrite {
            info!(title = %title, "file already exists, skipping");
            self.ctx.state.increment_skipped();
            return Ok(());
        }

        // Phase two: everything needed to open the byte stream.
        let id = self.id()?;
        check_geoblocked(&page, &self.url)?;
        check_premium(&page, &title)?;
        let metadata = parse_player_metadata(&page, &id, &self.url)?;
        let resolution =
            select_resolution(&self.ctx.options.resolution, &metadata.qualities, &self.url)?;
        let stream_url = decrypt_stream_url(&metadata.file);
        debug!(url = %self.url, %resolution, "resolved stream location");

        self.stream_to_disk(&title, &resolution, &stream_url, &filepath)
            .await
    }

    /// Opens a ranged stream and appends it to the `.part` file, renaming
    /// to the final name on completion.
    async fn stream_to_disk(
        &self,
        title: &str,
        resolution: &str,
        stream_url: &str,
        filepath: &Path,
    ) -> Result<(), Error> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| Error::io(&self.directory, e))?;

        let partial = self.directory.join(format!("{title}.mp4.part"));
        let resume_offset = tokio::fs::metadata(&partial)
            .await
            .map(|meta| meta.len())
            .unwrap_or(0);

        let mut headers = page_headers();
        headers.insert(
            RANGE,
            HeaderValue::from_str(&format!("bytes={resume_offset}-"))
                .unwrap_or_else(|_| HeaderValue::from_static("bytes=0-")),
        );
        let response = self.ctx.fetcher.get(stream_url, headers).await?;
        let remaining = response.content_length().unwrap_or(0);

        // A stale final file can only exist here in overwrite mode.
        if filepath.exists() {
            tokio::fs::remove_file(&filepath)
                .await
                .map_err(|e| Error::io(filepath, e))?;
        }

        let bar = self.ctx.progress.transfer_bar(
            &format!("{title}.mp4 [{resolution}]"),
            resume_offset + remaining,
            resume_offset,
        );

        // Append mode keeps previously transferred bytes; an interrupted run
        // resumes from this offset instead of truncating.
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&partial)
            .await
            .map_err(|e| Error::io(&partial, e))?;
        let mut writer = BufWriter::with_capacity(STREAM_CHUNK_SIZE, file);

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|source| crate::fetch::FetchError::network(stream_url, source))?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| Error::io(&partial, e))?;
            bar.inc(chunk.len() as u64);
        }
        writer.flush().await.map_err(|e| Error::io(&partial, e))?;

        tokio::fs::rename(&partial, &filepath)
            .await
            .map_err(|e| Error::io(filepath, e))?;
        bar.finish_and_clear();

        info!(title = %title, %resolution, path = %filepath.display(), "download complete");
        self.ctx.state.increment_completed();
        Ok(())
    }

    async fn fetch_page(&self) -> Result<String, Error> {
        Ok(self.ctx.fetcher.get_text(&self.url, page_headers()).await?)
    }

    fn id(&self) -> Result<String, Error> {
        video_id(&self.url).ok_or_else(|| Error::InvalidUrl {
            url: self.url.clone(),
        })
    }
}

/// Downloads a batch of videos under the shared concurrency limiter.
///
/// Each video runs in its own task; a semaphore permit is acquired before
/// the pipeline starts and released when it finishes (RAII). Task panics are
/// logged and never abort the batch.
pub async fn dispatch_videos(videos: Vec<Video>, limiter: Arc<Semaphore>) {
    run_bounded(limiter, videos, Video::download).await;
}

/// Spawns one task per item, gated by `limiter`.
///
/// At most `limiter`'s permit count of items are past the acquisition point
/// at any moment; admission order follows the semaphore's FIFO queue.
pub(crate) async fn run_bounded<T, F, Fut>(limiter: Arc<Semaphore>, items: Vec<T>, run: F)
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut handles = Vec::new();
    for item in items {
        let limiter = Arc::clone(&limiter);
        let run = run.clone();
        handles.push(tokio::spawn(async move {
            // A closed semaphore means the run is shutting down.
            let Ok(_permit) = limiter.acquire_owned().await else {
                return;
            };
            run(item).await;
        }));
    }
    for handle in handles {
        if let Err(error) = handle.await {
            warn!(error = %error, "download task panicked");
        }
    }
}

/// Extracts and sanitizes the page title.
fn parse_title(page: &str, url: &str) -> Result<String, Error> {
    let doc = Document::parse(page, url);
    let node = doc.find_required(&TITLE_SELECTOR, "video title")?;
    Ok(sanitize(&element_text(node)))
}

/// Extracts the player metadata block keyed by the video id.
fn parse_player_metadata(page: &str, id: &str, url: &str) -> Result<PlayerMetadata, Error> {
    let doc = Document::parse(page, url);
    let selector = Selector::parse(&format!("div#mediaplayer{id}"))
        .map_err(|_| Error::parser("media player", url))?;
    let node = doc.find_required(&selector, "media player")?;
    let raw = node
        .value()
        .attr("player_data")
        .ok_or_else(|| Error::parser("player data", url))?;
    let data: PlayerData =
        serde_json::from_str(raw).map_err(|_| Error::parser("player data", url))?;
    Ok(PlayerMetadata {
        qualities: data.video.qualities.keys().cloned().collect(),
        file: data.video.file,
    })
}

/// Fails with [`Error::GeoBlocked`] when the page carries the regional
/// block notice.
fn check_geoblocked(page: &str, url: &str) -> Result<(), Error> {
    if GEOBLOCK_PATTERN.is_match(page) {
        return Err(Error::GeoBlocked {
            url: url.to_string(),
        });
    }
    Ok(())
}

/// Fails with [`Error::LoginRequired`] when the video is premium-only.
fn check_premium(page: &str, title: &str) -> Result<(), Error> {
    if page.contains(PREMIUM_PHRASE) {
        return Err(Error::LoginRequired {
            title: title.to_string(),
        });
    }
    Ok(())
}

/// Picks the target resolution.
///
/// The site lists qualities in ascending order, so `"best"` resolves to the
/// last enumerated label. An explicit label must be a member of the list.
///
/// # Errors
///
/// Returns [`Error::Resolution`] for an explicit label that is not offered,
/// or [`Error::Parser`] when the list itself is empty.
pub fn select_resolution(
    requested: &str,
    resolutions: &[String],
    url: &str,
) -> Result<String, Error> {
    if requested == BEST_RESOLUTION {
        return resolutions
            .last()
            .cloned()
            .ok_or_else(|| Error::parser("qualities", url));
    }
    if resolutions.iter().any(|label| label == requested) {
        Ok(requested.to_string())
    } else {
        Err(Error::Resolution {
            requested: requested.to_string(),
            url: url.to_string(),
        })
    }
}
