//! Typed accessors over parsed HTML.
//!
//! Every markup lookup in the pipeline goes through [`Document`], which
//! forces each optional node access to declare its failure mode as a
//! [`Error::Parser`] naming the missing node and the source URL, instead of
//! silently propagating `None` from deep inside page parsing.
//!
//! `scraper::Html` is not `Send`, so a `Document` must never be held across
//! an await point; callers fetch the page text first and do all extraction
//! synchronously.

use scraper::{ElementRef, Html, Selector};

use crate::error::Error;

/// A parsed HTML page tied to the URL it came from.
pub struct Document {
    html: Html,
    url: String,
}

impl Document {
    /// Parses page text into a document.
    #[must_use]
    pub fn parse(text: &str, url: impl Into<String>) -> Self {
        Self {
            html: Html::parse_document(text),
            url: url.into(),
        }
    }

    /// Returns the first element matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parser`] naming `what` when no element matches.
    pub fn find_required(
        &self,
        selector: &Selector,
        what: &'static str,
    ) -> Result<ElementRef<'_>, Error> {
        self.html
            .select(selector)
            .next()
            .ok_or_else(|| Error::parser(what, &self.url))
    }

    /// Returns the last element matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parser`] naming `what` when no element matches.
    pub fn find_last_required(
        &self,
        selector: &Selector,
        what: &'static str,
    ) -> Result<ElementRef<'_>, Error> {
        self.html
            .select(selector)
            .last()
            .ok_or_else(|| Error::parser(what, &self.url))
    }

    /// Returns every element matching `selector`; absence is not an error.
    #[must_use]
    pub fn select_all(&self, selector: &Selector) -> Vec<ElementRef<'_>> {
        self.html.select(selector).collect()
    }
}

/// Collects the text content of an element, trimmed of surrounding
/// whitespace.
#[must_use]
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
