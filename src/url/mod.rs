//! URL handling module for Shiori
//!
//! This module provides canonical location normalization, relative reference
//! resolution, page-kind classification and the numeric path helpers the
//! ordering and probing heuristics depend on.

mod normalize;

use url::Url;

// Re-export main functions
pub use normalize::{canonical_key, canonical_location, resolve_reference};

/// Page-file suffixes recognised on chapter locations
pub const PAGE_SUFFIXES: &[&str] = &[".html", ".htm", ".shtml"];

/// Kind of page a location is expected to serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    /// A table of contents enumerating many chapters
    Listing,
    /// A single chapter
    Chapter,
}

impl PageKind {
    /// Returns true for listing pages
    pub fn is_listing(&self) -> bool {
        matches!(self, Self::Listing)
    }
}

/// Classifies a location as a listing page or a chapter page
///
/// A location is a chapter page when its final path segment carries a known
/// page-file suffix and its stem contains a digit (`/b/42/1088.html`,
/// `/b/42/chapter-3.htm`). Anything else (trailing slash, no suffix, a stem
/// with no digits such as `index.html`) is treated as a listing page.
///
/// # Examples
///
/// ```
/// use shiori::url::{classify_page, PageKind};
/// use url::Url;
///
/// let chapter = Url::parse("https://example.com/b/42/1088.html").unwrap();
/// assert_eq!(classify_page(&chapter), PageKind::Chapter);
///
/// let listing = Url::parse("https://example.com/b/42/").unwrap();
/// assert_eq!(classify_page(&listing), PageKind::Listing);
/// ```
pub fn classify_page(url: &Url) -> PageKind {
    if url.path().ends_with('/') {
        return PageKind::Listing;
    }

    match split_page_segment(url) {
        Some((stem, _)) if stem.chars().any(|c| c.is_ascii_digit()) => PageKind::Chapter,
        _ => PageKind::Listing,
    }
}

/// Parses the numeric identifier carried by the trailing path segment
///
/// Only purely numeric stems with a known page-file suffix qualify
/// (`/b/42/1088.html` → 1088); `chapter-3.html` does not.
pub fn trailing_numeric_id(url_str: &str) -> Option<u64> {
    let url = Url::parse(url_str).ok()?;
    let (stem, _) = split_page_segment(&url)?;
    if stem.is_empty() || !stem.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// Returns true if the reference's final path segment is purely numeric with a
/// known page-file suffix
///
/// Works on raw (possibly relative) references as found in markup.
pub fn is_numeric_page_reference(href: &str) -> bool {
    let path = href
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim();
    let segment = path.rsplit('/').next().unwrap_or_default();

    PAGE_SUFFIXES.iter().any(|suffix| {
        segment
            .strip_suffix(suffix)
            .map(|stem| !stem.is_empty() && stem.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false)
    })
}

/// Splits a numeric chapter location into the template around its identifier
///
/// `https://example.com/b/42/1088.html` → (`https://example.com/b/42/`, `.html`).
/// Used to synthesize probe locations for a missing first chapter.
pub fn numeric_page_template(url_str: &str) -> Option<(String, String)> {
    let url = Url::parse(url_str).ok()?;
    if url.query().is_some() {
        return None;
    }
    let (stem, suffix) = split_page_segment(&url)?;
    if stem.is_empty() || !stem.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let mut without_fragment = url.clone();
    without_fragment.set_fragment(None);
    let full = without_fragment.to_string();
    let tail_len = stem.len() + suffix.len();
    let prefix = full[..full.len() - tail_len].to_string();

    Some((prefix, suffix.to_string()))
}

/// Splits the final path segment into (stem, suffix) when the suffix is known
fn split_page_segment(url: &Url) -> Option<(&str, &'static str)> {
    let segment = url.path_segments()?.last()?;
    PAGE_SUFFIXES.iter().find_map(|suffix| {
        segment
            .strip_suffix(suffix)
            .map(|stem| (stem, *suffix))
    })
}
