//! Chapter Index Resolver
//!
//! Turns a listing page into a [`NovelIndex`]:
//!
//! 1. Novel identity from metadata and heading cascades
//! 2. Chapter-list region via [`locate_region`]
//! 3. Region links run through the link classifier
//! 4. Whole-page rescan when fewer than 10 candidates were found
//! 5. First-chapter resolution, probing numeric locations as a last resort
//! 6. Exact-location deduplication, first occurrence kept
//! 7. Final ordering by the ordering engine

use super::classifier::{classify, LinkReason};
use super::numerals::{denotes_first_chapter, title_ordinal};
use super::region::locate_region;
use super::{order, ChapterCandidate, NovelIndex, UNKNOWN};
use crate::crawler::parser::{
    extract_body, extract_links, extract_title, first_text, meta_content, prefix_before_separator,
};
use crate::crawler::PageFetcher;
use crate::url::{numeric_page_template, resolve_reference};
use regex::Regex;
use scraper::Html;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, LazyLock};
use url::Url;

/// Candidate count below which the whole page is rescanned
const RESCAN_THRESHOLD: usize = 10;

/// Identifiers substituted into the numeric-path template when probing
const PROBE_IDS: [u64; 5] = [1, 1000, 10_000, 100_000, 1_000_000];

static TITLE_TAG_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)(?:最新章节|全文阅读|无弹窗)").unwrap());

static SUBTITLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[_\-].*$").unwrap());

static AUTHOR_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"作\s*者[：:]\s*<a[^>]*>([^<]+)</a>",
        r"作\s*者[：:]\s*([^<>\s]+)",
        r"作\s*者：</span>\s*([^<]+)",
        r"<p>作\s*者：([^<]+)</p>",
        r"(?i)\bauthor\s*[:：]\s*(?:<[^>]+>\s*)*([^<>\n]+)",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Extracts the novel name and author from a listing page
///
/// # Name cascade
///
/// `og:novel:book_name` → `og:title` → first `h1` → `div.bookname` →
/// `<title>` before "最新章节"/"全文阅读"/"无弹窗" → `<title>` before the first
/// `_`, `-` or `|`. Anything after a `_` or `-` in the chosen value is treated
/// as a subtitle and dropped.
///
/// # Author cascade
///
/// `og:novel:author` → `meta[name=author]` → "作者：" / "Author:" markup
/// patterns.
///
/// Missing values are reported as [`UNKNOWN`].
pub fn extract_identity(html: &str) -> (String, String) {
    let document = Html::parse_document(html);

    let title_tag = first_text(&document, "title");
    let novel_name = meta_content(&document, r#"meta[property="og:novel:book_name"]"#)
        .or_else(|| meta_content(&document, r#"meta[property="og:title"]"#))
        .or_else(|| first_text(&document, "h1"))
        .or_else(|| first_text(&document, "div.bookname"))
        .or_else(|| {
            title_tag.as_deref().and_then(|title| {
                TITLE_TAG_SUFFIX
                    .captures(title)
                    .map(|caps| caps[1].trim().to_string())
                    .filter(|name| !name.is_empty())
            })
        })
        .or_else(|| title_tag.as_deref().and_then(prefix_before_separator))
        .map(|name| SUBTITLE.replace(&name, "").trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string());

    let author = meta_content(&document, r#"meta[property="og:novel:author"]"#)
        .or_else(|| meta_content(&document, r#"meta[name="author"]"#))
        .or_else(|| {
            AUTHOR_PATTERNS.iter().find_map(|pattern| {
                pattern
                    .captures(html)
                    .map(|caps| caps[1].trim().to_string())
                    .filter(|author| !author.is_empty())
            })
        })
        .unwrap_or_else(|| UNKNOWN.to_string());

    (novel_name, author)
}

/// Accepted candidates plus per-reason tallies for logging
#[derive(Debug, Default)]
struct Collection {
    candidates: Vec<ChapterCandidate>,
    locations: HashSet<String>,
    tally: BTreeMap<LinkReason, usize>,
    scanned: usize,
}

impl Collection {
    /// Classifies every link in `markup`, keeping new chapter locations
    fn collect(&mut self, markup: &str, base: &Url) {
        for (text, href) in extract_links(markup) {
            self.scanned += 1;
            let verdict = classify(&text, &href);
            *self.tally.entry(verdict.reason).or_default() += 1;
            if !verdict.is_chapter {
                continue;
            }

            let Some(location) = resolve_reference(&href, base) else {
                continue;
            };
            let location = location.to_string();
            if self.locations.insert(location.clone()) {
                self.candidates.push(ChapterCandidate::new(text, location));
            }
        }
    }

    fn contains(&self, location: &str) -> bool {
        self.locations.contains(location)
    }

    /// Inserts a resolved first chapter at the head unless already present
    fn insert_first(&mut self, first: ChapterCandidate) {
        if self.locations.insert(first.location.clone()) {
            tracing::info!("Added first chapter at head: {}", first.title);
            self.candidates.insert(0, first);
        }
    }

    fn log_summary(&self) {
        let accepted = self.candidates.len();
        let distribution: Vec<String> = self
            .tally
            .iter()
            .map(|(reason, count)| format!("{}={}", reason, count))
            .collect();
        tracing::debug!(
            "Classified {} links: {} chapter candidates ({})",
            self.scanned,
            accepted,
            distribution.join(", ")
        );
    }
}

/// The most plausible first chapter among several candidates
fn pick_first(mut options: Vec<ChapterCandidate>) -> Option<ChapterCandidate> {
    options.sort_by_key(|candidate| title_ordinal(&candidate.title).unwrap_or(9999));
    options.into_iter().next()
}

/// Resolves listing pages into ordered chapter indexes
///
/// Holds the page fetcher used to probe for a missing first chapter.
pub struct ChapterIndexResolver {
    fetcher: Arc<dyn PageFetcher>,
    minimum_content_length: usize,
}

impl ChapterIndexResolver {
    /// Creates a resolver
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Fetcher used for first-chapter probes
    /// * `minimum_content_length` - Body length a probe page must reach to count
    pub fn new(fetcher: Arc<dyn PageFetcher>, minimum_content_length: usize) -> Self {
        Self {
            fetcher,
            minimum_content_length,
        }
    }

    /// Resolves a listing page into a chapter index
    ///
    /// Returns None when no chapter candidates survive every step; the caller
    /// then falls back to following "next" links.
    pub async fn resolve(&self, markup: &str, listing: &Url) -> Option<NovelIndex> {
        let (novel_name, author) = extract_identity(markup);
        tracing::debug!("Listing identity: {} / {}", novel_name, author);

        let mut collection = Collection::default();
        match locate_region(markup) {
            Some((region, source)) => {
                tracing::debug!("Chapter list region: {} ({} bytes)", source, region.len());
                collection.collect(&region, listing);
            }
            None => tracing::debug!("No chapter list region found on {}", listing),
        }

        if collection.candidates.len() < RESCAN_THRESHOLD {
            tracing::debug!(
                "Only {} candidates in region, rescanning whole page",
                collection.candidates.len()
            );
            collection.collect(markup, listing);
        }
        collection.log_summary();

        if let Some(first) = self.find_first_chapter(markup, listing, &collection).await {
            collection.insert_first(first);
        }

        if collection.candidates.is_empty() {
            tracing::warn!("No chapter candidates found on {}", listing);
            return None;
        }

        let ordered_chapters = order(&collection.candidates);
        tracing::info!(
            "Resolved {} chapters for {} from {}",
            ordered_chapters.len(),
            novel_name,
            listing
        );

        Some(NovelIndex {
            novel_name,
            author,
            ordered_chapters,
        })
    }

    /// First-chapter resolution cascade
    ///
    /// 1. A collected candidate titled as chapter one
    /// 2. Any link on the page whose text names chapter one
    /// 3. Probing numeric locations built from collected candidates
    async fn find_first_chapter(
        &self,
        markup: &str,
        listing: &Url,
        collection: &Collection,
    ) -> Option<ChapterCandidate> {
        let listed: Vec<ChapterCandidate> = collection
            .candidates
            .iter()
            .filter(|candidate| denotes_first_chapter(&candidate.title))
            .cloned()
            .collect();
        if let Some(first) = pick_first(listed) {
            tracing::debug!("First chapter listed: {} -> {}", first.title, first.location);
            return Some(first);
        }

        let on_page: Vec<ChapterCandidate> = extract_links(markup)
            .into_iter()
            .filter(|(text, _)| denotes_first_chapter(text))
            .filter_map(|(text, href)| {
                let location = resolve_reference(&href, listing)?.to_string();
                (!collection.contains(&location)).then(|| ChapterCandidate::new(text, location))
            })
            .collect();
        if let Some(first) = pick_first(on_page) {
            tracing::debug!("First chapter found outside the list: {}", first.location);
            return Some(first);
        }

        self.probe_first_chapter(&collection.candidates).await
    }

    /// Fetches synthesized locations until one is a valid first chapter
    async fn probe_first_chapter(&self, candidates: &[ChapterCandidate]) -> Option<ChapterCandidate> {
        let mut templates: Vec<(String, String)> = Vec::new();
        for candidate in candidates {
            if let Some(template) = numeric_page_template(&candidate.location) {
                if !templates.contains(&template) {
                    templates.push(template);
                }
            }
        }

        for (prefix, suffix) in &templates {
            for id in PROBE_IDS {
                let location = format!("{}{}{}", prefix, id, suffix);
                let Ok(url) = Url::parse(&location) else {
                    continue;
                };

                tracing::debug!("Probing for first chapter at {}", url);
                let markup = match self.fetcher.fetch(&url).await {
                    Ok(markup) => markup,
                    Err(e) => {
                        tracing::debug!("Probe failed: {}", e);
                        continue;
                    }
                };

                if let Some(first) = self.accept_probe(&markup, &url) {
                    tracing::info!("Probe found first chapter: {} -> {}", first.title, url);
                    return Some(first);
                }
            }
        }

        None
    }

    /// A probe counts when the page has a real body and its title is chapter one
    fn accept_probe(&self, markup: &str, url: &Url) -> Option<ChapterCandidate> {
        let body = extract_body(markup);
        if body.chars().count() < self.minimum_content_length {
            return None;
        }

        let title = extract_title(markup, "");
        let is_first = denotes_first_chapter(&title) || title_ordinal(&title) == Some(1);
        is_first.then(|| ChapterCandidate::new(title, url.to_string()))
    }
}
