//! Chapter-list region detection on listing pages
//!
//! Listing pages mix the chapter list with recommendation boxes, "latest
//! chapters" teasers and site navigation. The region is located by an
//! ordered cascade:
//!
//! 1. Explicit "body text" (`正文`) markers. Every marker pattern is tried and
//!    the longest match wins, as the most complete list is usually the longest.
//! 2. Known chapter-list containers, first match wins.
//! 3. A link-density scan: the `div` with the most links among those holding
//!    more than 10 links whose markup is more than 30% link markup.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use std::sync::LazyLock;

/// Minimum links a block must hold to be considered by the density scan
const DENSITY_MIN_LINKS: usize = 10;

/// Minimum share of a block's markup that must be link markup
const DENSITY_MIN_RATIO: f64 = 0.3;

static BODY_MARKERS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?s)正文</dt>(.*?)</dl>", "body-marker dt"),
        (r"(?s)正文</h\d>(.*?)(?:<h\d>|</div>)", "body-marker heading"),
        (r"(?s)正文</span>(.*?)(?:</div>|<div)", "body-marker span"),
        (r"(?s)<dt[^>]*>正文</dt>(.*?)</dl>", "body-marker full dt"),
        (
            r"(?s)正文</[^>]+>(.*?)(?:<h\d>|<div[^>]*id=|</section>)",
            "body-marker generic",
        ),
        (
            r"(?s)《[^》]+》正文(.*?)(?:最新章节|新书推荐|</div>)",
            "body-marker titled",
        ),
        (r"(?s)正文卷(.*?)(?:完结感言|<h\d>|</div>)", "body-marker volume"),
    ]
    .into_iter()
    .map(|(pattern, name)| (Regex::new(pattern).unwrap(), name))
    .collect()
});

/// Container selectors, in the order they are tried
const CONTAINER_SELECTORS: &[&str] = &[
    "div#list",
    "div.listmain",
    "dl#chapterlist",
    "ul.chapter",
    "div#content_1",
    "div.chapter-list",
    "ul.chapter-list",
    "div#toc",
];

static LIST_HEADINGS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?s)最新章节列表.*?<ul>(.*?)</ul>", "latest-list heading"),
        (r"(?s)章节列表.*?<ul[^>]*>(.*?)</ul>", "chapter-list heading"),
    ]
    .into_iter()
    .map(|(pattern, name)| (Regex::new(pattern).unwrap(), name))
    .collect()
});

/// Which heuristic located the working region
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionSource {
    /// A "body text" marker pattern
    BodyMarker(&'static str),
    /// A known chapter-list container
    Container(&'static str),
    /// The densest link block
    LinkDensity { links: usize },
}

impl fmt::Display for RegionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BodyMarker(name) => write!(f, "{}", name),
            Self::Container(name) => write!(f, "container {}", name),
            Self::LinkDensity { links } => write!(f, "link-dense block ({} links)", links),
        }
    }
}

/// Locates the chapter-list region of a listing page
///
/// Returns the region's markup and the heuristic that found it, or None if no
/// heuristic matched (callers then scan the whole page).
pub fn locate_region(html: &str) -> Option<(String, RegionSource)> {
    if let Some(found) = longest_body_marker(html) {
        return Some(found);
    }

    if let Some(found) = known_container(html) {
        return Some(found);
    }

    densest_link_block(html)
}

fn longest_body_marker(html: &str) -> Option<(String, RegionSource)> {
    let mut best: Option<(&str, &'static str)> = None;

    for (pattern, name) in BODY_MARKERS.iter() {
        let Some(region) = pattern.captures(html).and_then(|caps| caps.get(1)) else {
            continue;
        };
        tracing::trace!("Body marker {} matched {} bytes", name, region.len());
        if best.map_or(true, |(current, _)| region.len() > current.len()) {
            best = Some((region.as_str(), *name));
        }
    }

    best.filter(|(region, _)| !region.trim().is_empty())
        .map(|(region, name)| (region.to_string(), RegionSource::BodyMarker(name)))
}

fn known_container(html: &str) -> Option<(String, RegionSource)> {
    let document = Html::parse_document(html);

    for name in CONTAINER_SELECTORS {
        let Ok(selector) = Selector::parse(name) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let inner = element.inner_html();
            if !inner.trim().is_empty() {
                return Some((inner, RegionSource::Container(*name)));
            }
        }
    }

    LIST_HEADINGS.iter().find_map(|(pattern, name)| {
        pattern
            .captures(html)
            .and_then(|caps| caps.get(1))
            .filter(|region| !region.as_str().trim().is_empty())
            .map(|region| (region.as_str().to_string(), RegionSource::Container(*name)))
    })
}

fn densest_link_block(html: &str) -> Option<(String, RegionSource)> {
    let document = Html::parse_document(html);
    let div_selector = Selector::parse("div").ok()?;
    let link_selector = Selector::parse("a[href]").ok()?;

    let mut best: Option<(ElementRef, usize)> = None;

    for block in document.select(&div_selector) {
        let links: Vec<ElementRef> = block.select(&link_selector).collect();
        if links.len() <= DENSITY_MIN_LINKS {
            continue;
        }

        let link_markup: usize = links.iter().map(|link| link.html().len()).sum();
        let ratio = link_markup as f64 / (block.html().len() as f64 + 0.1);
        if ratio <= DENSITY_MIN_RATIO {
            continue;
        }

        if best.map_or(true, |(_, count)| links.len() > count) {
            best = Some((block, links.len()));
        }
    }

    best.map(|(block, links)| (block.html(), RegionSource::LinkDensity { links }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter_links(count: usize) -> String {
        (1..=count)
            .map(|i| format!(r#"<a href="/b/{}.html">第{}章</a>"#, i, i))
            .collect()
    }

    #[test]
    fn test_longest_body_marker_wins() {
        let html = format!(
            "<dl><dt>正文</dt>{}</dl><div><h2>正文</h2>{}</div>",
            chapter_links(2),
            chapter_links(12)
        );

        let (region, source) = locate_region(&html).unwrap();
        assert!(matches!(source, RegionSource::BodyMarker(_)));
        assert!(region.contains("/b/12.html"));
    }

    #[test]
    fn test_container_selector() {
        let html = format!(
            r#"<div class="nav"><a href="/">首页</a></div><div id="list"><dl>{}</dl></div>"#,
            chapter_links(3)
        );

        let (region, source) = locate_region(&html).unwrap();
        assert_eq!(source, RegionSource::Container("div#list"));
        assert!(region.contains("/b/3.html"));
        assert!(!region.contains("首页"));
    }

    #[test]
    fn test_list_heading_regex() {
        let html = format!("<h3>章节列表</h3><ul class=\"x\">{}</ul>", chapter_links(4));

        let (region, source) = locate_region(&html).unwrap();
        assert_eq!(source, RegionSource::Container("chapter-list heading"));
        assert!(region.contains("/b/4.html"));
    }

    #[test]
    fn test_link_density_scan() {
        let html = format!(
            r#"<div class="sidebar"><a href="/x">x</a><p>{}</p></div><div class="chapters">{}</div>"#,
            "filler text ".repeat(50),
            chapter_links(15)
        );

        let (region, source) = locate_region(&html).unwrap();
        assert_eq!(source, RegionSource::LinkDensity { links: 15 });
        assert!(region.contains("/b/15.html"));
    }

    #[test]
    fn test_sparse_blocks_are_ignored() {
        let html = format!(
            r#"<div>{}<p>{}</p></div>"#,
            chapter_links(11),
            "long prose paragraph ".repeat(200)
        );

        assert!(locate_region(&html).is_none());
    }

    #[test]
    fn test_no_region() {
        assert!(locate_region("<html><body><p>nothing here</p></body></html>").is_none());
    }

    #[test]
    fn test_source_display() {
        assert_eq!(
            RegionSource::Container("div#list").to_string(),
            "container div#list"
        );
        assert_eq!(
            RegionSource::LinkDensity { links: 12 }.to_string(),
            "link-dense block (12 links)"
        );
    }
}
