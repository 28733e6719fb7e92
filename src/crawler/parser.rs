//! Content extraction from chapter and listing pages
//!
//! This module handles parsing HTML content to extract:
//! - The chapter body, with advertising boilerplate removed
//! - The chapter title
//! - Previous/next/index navigation references
//! - Novel metadata (name, author, category)
//! - Raw (text, href) link pairs for the index resolver
//!
//! Every extractor is an ordered cascade of patterns where the first match
//! wins. Site conventions vary too much for any single pattern to be reliable.

use crate::chapter::UNKNOWN;
use crate::storage::ChapterRecord;
use crate::url::resolve_reference;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use thiserror::Error;
use url::Url;

/// A chapter page that did not yield usable prose
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("No chapter body found at {url}")]
    MissingBody { url: String },

    #[error("Chapter body at {url} is {length} characters, below the minimum of {minimum}")]
    ContentTooShort {
        url: String,
        length: usize,
        minimum: usize,
    },
}

/// Body containers, in the order they are tried
const BODY_SELECTORS: &[&str] = &[
    "div#content",
    "div.content",
    "div.chapter-content",
    "div.article-content",
    "article",
];

/// Elements whose text never belongs to the prose
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript"];

static BOILERPLATE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"新书推荐：.*",
        r"请记住本[站书].*?。",
        r"[一此本][书站]首发",
        r"天才一秒记住.*?。",
        r"热门推荐.*",
        r"\(https?://[^)]+\)",
        r"手机用户请浏览.*",
        r"txt下载.*",
        r"（.*?未完.*?）",
        r"（.*?请到.*?）",
        r"（.*?记住网址.*?）",
        r"本章未完.*",
        r"未完待续.*",
        r"请到.*?阅读",
        r"本书来自.*",
        r"本作品来自.*",
        r"本小说.*?更新最快",
        r"喜欢本书请收藏.*",
        r"章节报错.*",
        r"加入书架.*",
        r"求收藏.*",
        r"求月票.*",
        r"感谢.*?打赏",
        r"【.*?】",
        r"\[.*?\]",
        r"(?i)\bto be continued\b.*",
        r"(?i)\bremember (?:this|our) (?:site|website|domain)\b.*",
        r"https?://\S+",
    ]
    .into_iter()
    .map(|pattern| Regex::new(&format!("(?m){}", pattern)).unwrap())
    .collect()
});

const PREVIOUS_LABELS: &[&str] = &[
    "上一章",
    "上一页",
    "上一",
    "上章",
    "previous chapter",
    "previous",
    "prev",
];

const NEXT_LABELS: &[&str] = &["下一章", "下一页", "下一", "下章", "next chapter", "next"];

const INDEX_LABELS: &[&str] = &[
    "目录",
    "章节目录",
    "回目录",
    "返回目录",
    "table of contents",
    "contents",
    "index",
];

/// Navigational references found on a chapter page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Navigation {
    pub previous: Option<Url>,
    pub next: Option<Url>,
    pub index: Option<Url>,
}

/// Novel metadata advertised by a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub novel_name: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
}

/// Collects an element's visible text, one trimmed line per text node
fn element_text_lines(element: ElementRef) -> Vec<String> {
    element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent_name = node
                .parent()
                .and_then(|parent| parent.value().as_element().map(|e| e.name().to_string()));
            if parent_name.is_some_and(|name| SKIPPED_ELEMENTS.contains(&name.as_str())) {
                return None;
            }
            let line = text.trim();
            (!line.is_empty()).then(|| line.to_string())
        })
        .collect()
}

pub(crate) fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .find(|text| !text.is_empty())
}

/// Content attribute of the first element matching `selector`
pub(crate) fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .find(|content| !content.is_empty())
}

/// Text before the first `-`, `_` or `|`, if the text has one
pub(crate) fn prefix_before_separator(text: &str) -> Option<String> {
    let (prefix, _) = text.split_once(['-', '_', '|'])?;
    let prefix = prefix.trim();
    (!prefix.is_empty()).then(|| prefix.to_string())
}

/// Removes advertising boilerplate and reflows the text into paragraphs
///
/// Each surviving non-empty line becomes one paragraph; paragraphs are
/// separated by a blank line.
pub fn clean_body(raw: &str) -> String {
    let mut text = raw.replace('\u{a0}', " ");
    for pattern in BOILERPLATE.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Extracts and cleans the chapter body
///
/// Returns an empty string when no body container is present.
pub fn extract_body(html: &str) -> String {
    let document = Html::parse_document(html);

    for name in BODY_SELECTORS {
        let Ok(selector) = Selector::parse(name) else {
            continue;
        };
        let Some(container) = document.select(&selector).next() else {
            continue;
        };

        let lines = element_text_lines(container);
        if lines.is_empty() {
            continue;
        }

        tracing::trace!("Chapter body found in {}", name);
        return clean_body(&lines.join("\n"));
    }

    String::new()
}

/// Extracts the chapter title
///
/// # Cascade
///
/// 1. First `h1`
/// 2. `<title>` text before the first `-`, `_` or `|`
/// 3. `div.bookname h1`
/// 4. `div.chapter-title span`
/// 5. `fallback`
pub fn extract_title(html: &str, fallback: &str) -> String {
    let document = Html::parse_document(html);

    first_text(&document, "h1")
        .or_else(|| first_text(&document, "title").and_then(|t| prefix_before_separator(&t)))
        .or_else(|| first_text(&document, "div.bookname h1"))
        .or_else(|| first_text(&document, "div.chapter-title span"))
        .unwrap_or_else(|| fallback.to_string())
}

/// Extracts every `a[href]` as a (visible text, raw href) pair
///
/// Works on whole documents and on region fragments alike.
pub fn extract_links(markup: &str) -> Vec<(String, String)> {
    let fragment = Html::parse_fragment(markup);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    fragment
        .select(&selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let text = element.text().collect::<String>();
            Some((text.trim().to_string(), href.trim().to_string()))
        })
        .collect()
}

/// Lowercased anchor text with decorative arrows and brackets removed
fn normalize_label(text: &str) -> String {
    text.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '<' | '>' | '«' | '»' | '←' | '→' | '【' | '】' | '[' | ']')
    })
    .to_lowercase()
}

fn find_by_labels(anchors: &[(String, String)], labels: &[&str], base: &Url) -> Option<Url> {
    labels.iter().find_map(|label| {
        anchors
            .iter()
            .filter(|(text, _)| text == label)
            .find_map(|(_, href)| resolve_reference(href, base))
    })
}

/// Extracts previous/next/index references, resolved against `base`
pub fn extract_navigation(html: &str, base: &Url) -> Navigation {
    let anchors: Vec<(String, String)> = extract_links(html)
        .into_iter()
        .map(|(text, href)| (normalize_label(&text), href))
        .collect();

    Navigation {
        previous: find_by_labels(&anchors, PREVIOUS_LABELS, base),
        next: find_by_labels(&anchors, NEXT_LABELS, base),
        index: find_by_labels(&anchors, INDEX_LABELS, base),
    }
}

/// Extracts novel metadata from structured `meta` tags
pub fn extract_metadata(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);

    let novel_name = meta_content(&document, r#"meta[property="og:novel:book_name"]"#)
        .or_else(|| meta_content(&document, r#"meta[name="book"]"#))
        .or_else(|| {
            meta_content(&document, r#"meta[property="og:title"]"#)
                .and_then(|title| prefix_before_separator(&title))
        });

    let author = meta_content(&document, r#"meta[property="og:novel:author"]"#)
        .or_else(|| meta_content(&document, r#"meta[name="author"]"#));

    let category = meta_content(&document, r#"meta[property="og:novel:category"]"#);

    PageMetadata {
        novel_name,
        author,
        category,
    }
}

/// Last path segment of a location, used as a title of last resort
fn location_basename(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .unwrap_or_else(|| url.to_string())
}

fn known(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != UNKNOWN)
        .map(str::to_string)
}

/// Builds a chapter record from a fetched chapter page
///
/// A novel identity already known to the caller wins over the page's own
/// metadata. The body must be at least `minimum_length` characters after
/// cleanup.
///
/// # Errors
///
/// * `ExtractionError::MissingBody` - No body container matched
/// * `ExtractionError::ContentTooShort` - The body is below the minimum
pub fn parse_chapter_page(
    html: &str,
    url: &Url,
    minimum_length: usize,
    known_name: Option<&str>,
    known_author: Option<&str>,
) -> Result<ChapterRecord, ExtractionError> {
    let body = extract_body(html);
    if body.is_empty() {
        return Err(ExtractionError::MissingBody {
            url: url.to_string(),
        });
    }

    let length = body.chars().count();
    if length < minimum_length {
        return Err(ExtractionError::ContentTooShort {
            url: url.to_string(),
            length,
            minimum: minimum_length,
        });
    }

    let title = extract_title(html, &location_basename(url));
    let navigation = extract_navigation(html, url);
    let metadata = extract_metadata(html);

    let novel_name = known(known_name)
        .or(metadata.novel_name)
        .unwrap_or_else(|| UNKNOWN.to_string());
    let author = known(known_author)
        .or(metadata.author)
        .unwrap_or_else(|| UNKNOWN.to_string());
    let category = metadata.category.unwrap_or_else(|| UNKNOWN.to_string());

    Ok(ChapterRecord {
        title,
        body,
        source_location: url.to_string(),
        previous_location: navigation.previous.map(String::from),
        next_location: navigation.next.map(String::from),
        index_location: navigation.index.map(String::from),
        novel_name,
        author,
        category,
        sequence_index: None,
        stored_filename: None,
    })
}
