//! Filesystem-safe name derivation for video and folder titles.

use std::sync::LazyLock;

use regex::Regex;

/// Characters that may not appear in a filename.
#[allow(clippy::expect_used)]
static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\w\s-]").expect("disallowed-chars regex is valid") // Static pattern, safe to panic
});

/// Runs of whitespace and hyphens, collapsed to a single underscore.
#[allow(clippy::expect_used)]
static SEPARATOR_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\s-]+").expect("separator regex is valid") // Static pattern, safe to panic
});

/// Converts a display title into a filesystem-safe name.
///
/// Removes every character that is not alphanumeric, underscore, whitespace,
/// or hyphen, collapses whitespace/hyphen runs into a single underscore, and
/// strips leading/trailing underscores. Total and idempotent:
/// `sanitize(sanitize(x)) == sanitize(x)` for any input.
#[must_use]
pub fn sanitize(title: &str) -> String {
    let stripped = DISALLOWED.replace_all(title, "");
    let joined = SEPARATOR_RUN.replace_all(&stripped, "_");
    joined.trim_matches('_').to_string()
}
