//! Input classification and name derivation.
//!
//! This module is pure: URL pattern matching against the site's known path
//! shapes ([`url`]) and filesystem-safe title derivation ([`title`]). No I/O
//! happens here; misclassified input surfaces as a per-URL warning at the
//! orchestrator boundary.

mod title;
mod url;

pub use title::sanitize;
pub use url::{
    UrlKind, classify, is_folder, is_video, next_page_url, normalize_folder_url, video_id,
};
