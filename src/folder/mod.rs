//! Recursive folder crawl and pagination.
//!
//! A folder drives its own pipeline: fetch the listing page, resolve the
//! title, create the matching directory, enumerate subfolders, then walk the
//! numbered listing pages collecting video links until a page fetch fails
//! (the page past the last one answers with an HTTP error) or a page lists
//! no videos (guards sites that serve an empty 200 instead). All collected
//! videos download under the shared global limiter before subfolders are
//! crawled, one at a time, mirroring the site hierarchy on disk.

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use scraper::Selector;
use tracing::{debug, info};

use crate::context::RunContext;
use crate::error::Error;
use crate::fetch::page_headers;
use crate::page::{Document, element_text};
use crate::parser::{next_page_url, normalize_folder_url, sanitize};
use crate::video::{Video, dispatch_videos};

/// Absolute prefix for the relative video links on listing pages.
const SITE_ROOT: &str = "https://www.cda.pl";

/// Attribute distinguishing real subfolder links from decorative anchors
/// that share the same class.
const SUBFOLDER_ID_ATTR: &str = "data-foldery_id";

#[allow(clippy::expect_used)]
static FOLDER_TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("span.folder-one-line").expect("folder title selector is valid")
    // Static selector, safe to panic
});

#[allow(clippy::expect_used)]
static TITLE_LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[href]").expect("title link selector is valid") // Static selector, safe to panic
});

#[allow(clippy::expect_used)]
static SUBFOLDER_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a.object-folder[href]").expect("subfolder selector is valid")
    // Static selector, safe to panic
});

#[allow(clippy::expect_used)]
static THUMBNAIL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a.thumbnail-link[href]").expect("thumbnail selector is valid")
    // Static selector, safe to panic
});

/// One folder listing and the context it crawls under.
///
/// The URL always carries an explicit page segment after construction.
#[derive(Debug)]
pub struct Folder {
    url: String,
    directory: PathBuf,
    ctx: RunContext,
}

impl Folder {
    /// Creates a folder task rooted at `parent_directory`.
    ///
    /// The URL is normalized to start at page 1 when it carries no page
    /// segment.
    #[must_use]
    pub fn new(url: &str, parent_directory: PathBuf, ctx: RunContext) -> Self {
        Self {
            url: normalize_folder_url(url),
            directory: parent_directory,
            ctx,
        }
    }

    /// Returns the normalized folder URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Recursively downloads all videos and subfolders of this folder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parser`] when the listing page lacks the title node,
    /// a transport error when the page fetch fails, or an IO error from
    /// directory creation. Individual video failures are absorbed by the
    /// video pipeline and never surface here.
    pub async fn download(&mut self) -> Result<(), Error> {
        let page = self.ctx.fetcher.get_text(&self.url, page_headers()).await?;
        let title = parse_folder_title(&page, &self.url)?;

        self.directory = self.directory.join(&title);
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| Error::io(&self.directory, e))?;

        let subfolder_urls = parse_subfolder_links(&page, &self.url);
        let video_urls = self.collect_video_urls().await;
        info!(
            %title,
            videos = video_urls.len(),
            subfolders = subfolder_urls.len(),
            "crawled folder"
        );

        let videos = video_urls
            .into_iter()
            .map(|url| Video::new(url, self.directory.clone(), self.ctx.clone()))
            .collect();
        dispatch_videos(videos, Arc::clone(&self.ctx.options.limiter)).await;

        for subfolder_url in subfolder_urls {
            let mut child = Folder::new(&subfolder_url, self.directory.clone(), self.ctx.clone());
            Box::pin(child.download()).await?;
        }
        Ok(())
    }

    /// Walks the numbered listing pages, collecting video links.
    ///
    /// Termination is the page fetch failing (missing pages answer with an
    /// HTTP error) or a page listing zero videos.
    async fn collect_video_urls(&self) -> Vec<String> {
        let mut collected = Vec::new();
        let mut page_url = self.url.clone();
        loop {
            let page = match self.ctx.fetcher.get_text(&page_url, page_headers()).await {
                Ok(text) => text,
                Err(error) => {
                    debug!(url = %page_url, error = %error, "listing page fetch failed, pagination done");
                    break;
                }
            };
            let videos = parse_video_links(&page, &page_url);
            if videos.is_empty() {
                debug!(url = %page_url, "listing page has no videos, pagination done");
                break;
            }
            collected.extend(videos);
            match next_page_url(&page_url) {
                Some(next) => page_url = next,
                None => break,
            }
        }
        collected
    }
}

/// Extracts and sanitizes the folder title.
///
/// The title lives in the last `folder-one-line` wrapper on the page, inside
/// its anchor.
fn parse_folder_title(page: &str, url: &str) -> Result<String, Error> {
    let doc = Document::parse(page, url);
    let wrapper = doc.find_last_required(&FOLDER_TITLE_SELECTOR, "folder title")?;
    let link = wrapper
        .select(&TITLE_LINK_SELECTOR)
        .next()
        .ok_or_else(|| Error::parser("folder title", url))?;
    Ok(sanitize(&element_text(link)))
}

/// Extracts subfolder links from the first listing page.
///
/// Only anchors carrying the folder-identifying data attribute count;
/// decorative links sharing the class are ignored.
fn parse_subfolder_links(page: &str, url: &str) -> Vec<String> {
    let doc = Document::parse(page, url);
    doc.select_all(&SUBFOLDER_SELECTOR)
        .into_iter()
        .filter(|anchor| anchor.value().attr(SUBFOLDER_ID_ATTR).is_some())
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(ToString::to_string)
        .collect()
}

/// Extracts video links from one listing page, absolutized against the site
/// root.
fn parse_video_links(page: &str, url: &str) -> Vec<String> {
    let doc = Document::parse(page, url);
    doc.select_all(&THUMBNAIL_SELECTOR)
        .into_iter()
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(|href| format!("{SITE_ROOT}{href}"))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const FOLDER_URL: &str = "https://www.cda.pl/someuser/wakacje/1/";

    const LISTING: &str = r#"
        <html><body>
            <span class="folder-one-line"><a href="/someuser">someuser</a></span>
            <span class="folder-one-line"><a href="/someuser/wakacje">Wakacje 2023</a></span>
            <a class="object-folder" href="https://www.cda.pl/someuser/gory" data-foldery_id="7">Góry</a>
            <a class="object-folder" href="https://www.cda.pl/promo">promo</a>
            <a class="thumbnail-link" href="/video/aaa111">one</a>
            <a class="thumbnail-link" href="/video/bbb222">two</a>
        </body></html>
    "#;

    #[test]
    fn test_parse_folder_title_takes_last_wrapper() {
        assert_eq!(
            parse_folder_title(LISTING, FOLDER_URL).unwrap(),
            "Wakacje_2023"
        );
    }

    #[test]
    fn test_parse_folder_title_missing_is_parser_error() {
        let result = parse_folder_title("<html><body></body></html>", FOLDER_URL);
        assert!(matches!(
            result,
            Err(Error::Parser {
                what: "folder title",
                ..
            })
        ));
    }

    #[test]
    fn test_parse_subfolder_links_requires_data_attribute() {
        let links = parse_subfolder_links(LISTING, FOLDER_URL);
        assert_eq!(links, vec!["https://www.cda.pl/someuser/gory".to_string()]);
    }

    #[test]
    fn test_parse_video_links_absolutized() {
        let links = parse_video_links(LISTING, FOLDER_URL);
        assert_eq!(
            links,
            vec![
                "https://www.cda.pl/video/aaa111".to_string(),
                "https://www.cda.pl/video/bbb222".to_string(),
            ]
        );
    }

    #[test]
    fn test_new_normalizes_url_to_first_page() {
        let options = crate::options::DownloadOptions::new(
            PathBuf::from("."),
            crate::options::BEST_RESOLUTION,
            false,
            1,
            true,
        )
        .unwrap();
        let ctx = RunContext::new(options);
        let folder = Folder::new("https://www.cda.pl/someuser/wakacje", PathBuf::from("."), ctx);
        assert_eq!(folder.url(), "https://www.cda.pl/someuser/wakacje/1/");
    }
}
