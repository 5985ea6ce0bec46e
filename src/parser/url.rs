//! URL classification for the two CDA.pl path shapes.
//!
//! A URL is either a video (`/video/<id>` or the short numeric-pair alias
//! `/<n>x<m>/<id>`), a folder (`/<section>/<slug>` or
//! `/<section>/folder/<numeric-id>`, optionally followed by a page number),
//! or unrecognized. Video matching takes precedence, so the two predicates
//! partition the URL space.
//!
//! Folder URLs are canonicalized to always carry an explicit page segment,
//! which makes `(base, page)` a usable key and lets the crawler compute the
//! next page without another HTTP round trip.

use std::sync::LazyLock;

use regex::Regex;

/// Matches video pages: `/video/<id>` and the `<n>x<m>/<id>` alias form.
#[allow(clippy::expect_used)]
static VIDEO_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(?:(?:www|ebd)\.)?cda\.pl/(?:video|[0-9]+x[0-9]+)/([0-9a-z]+)")
        .expect("video regex is valid") // Static pattern, safe to panic
});

/// Matches `/<section>/<slug>` folder listings with an optional page number.
///
/// The `regex` crate has no lookahead, so the `section != "video"` and
/// `slug != "folder"` exclusions are checked after matching.
#[allow(clippy::expect_used)]
static FOLDER_SLUG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(https?://(?:www\.)?cda\.pl/([a-z0-9_-]+)/([a-z0-9_-]+))/?([0-9]*)")
        .expect("folder slug regex is valid") // Static pattern, safe to panic
});

/// Matches `/<section>/folder/<numeric-id>` listings with an optional page.
#[allow(clippy::expect_used)]
static FOLDER_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(https?://(?:www\.)?cda\.pl/([a-z0-9_-]+)/folder/[0-9]+)/?([0-9]*)")
        .expect("folder id regex is valid") // Static pattern, safe to panic
});

/// Classification of an input URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlKind {
    /// A single video page.
    Video {
        /// The site-assigned video id extracted from the path.
        id: String,
    },
    /// A paginated folder listing.
    Folder {
        /// The folder URL without the trailing page segment.
        base: String,
        /// The page number, defaulting to 1 when absent.
        page: u32,
    },
    /// Neither shape matched.
    Unrecognized,
}

/// Classifies a URL into video, folder, or unrecognized.
///
/// Video matching wins over folder matching, so the result is a partition:
/// no URL is ever both.
#[must_use]
pub fn classify(url: &str) -> UrlKind {
    if let Some(id) = video_id(url) {
        return UrlKind::Video { id };
    }
    if let Some((base, page)) = folder_parts(url) {
        return UrlKind::Folder {
            base,
            page: page.unwrap_or(1),
        };
    }
    UrlKind::Unrecognized
}

/// Extracts the video id when the URL is a video page.
#[must_use]
pub fn video_id(url: &str) -> Option<String> {
    VIDEO_PATTERN
        .captures(url)
        .map(|caps| caps[1].to_string())
}

/// Returns true if the URL is a CDA video page.
#[must_use]
pub fn is_video(url: &str) -> bool {
    video_id(url).is_some()
}

/// Returns true if the URL is a CDA folder listing.
#[must_use]
pub fn is_folder(url: &str) -> bool {
    !is_video(url) && folder_parts(url).is_some()
}

/// Extracts `(base, page)` when the URL is a folder listing.
///
/// `page` is `None` when the URL carries no page segment.
fn folder_parts(url: &str) -> Option<(String, Option<u32>)> {
    if is_video(url) {
        return None;
    }
    if let Some(caps) = FOLDER_ID_PATTERN.captures(url) {
        if !caps[2].eq_ignore_ascii_case("video") {
            return Some((caps[1].to_string(), caps[3].parse().ok()));
        }
    }
    if let Some(caps) = FOLDER_SLUG_PATTERN.captures(url) {
        if !caps[2].eq_ignore_ascii_case("video") && !caps[3].eq_ignore_ascii_case("folder") {
            return Some((caps[1].to_string(), caps[4].parse().ok()));
        }
    }
    None
}

/// Canonicalizes a folder URL to carry an explicit page segment.
///
/// A trailing slash is ensured first; when no page number is present,
/// `1/` is appended, so crawling always starts from page 1.
#[must_use]
pub fn normalize_folder_url(url: &str) -> String {
    let mut normalized = url.to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    match folder_parts(&normalized) {
        Some((_, Some(_))) => normalized,
        _ => format!("{normalized}1/"),
    }
}

/// Computes the next listing page for a normalized folder URL.
///
/// Returns `None` when the URL is not a folder or carries no page segment.
#[must_use]
pub fn next_page_url(url: &str) -> Option<String> {
    let (base, page) = folder_parts(url)?;
    let page = page?;
    Some(format!("{base}/{}/", page + 1))
}
