//! Link classification
//!
//! Decides whether an anchor found on a listing page plausibly points at a
//! chapter. Rules are evaluated in order and the first match wins, so
//! high-confidence textual patterns are checked before the weaker structural
//! signal of a numeric page reference, and blocklisted navigation text is
//! rejected before anything else.

use crate::url::is_numeric_page_reference;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Navigation words in CJK sites' chrome
const CJK_NAVIGATION_WORDS: &[&str] = &["登录", "注册", "首页", "登陆", "帮助", "设置"];

/// Front-matter and back-matter markers in CJK titles
const CJK_SPECIAL_SECTIONS: &[&str] = &[
    "序言", "序章", "前言", "引言", "楔子", "尾声", "后记", "番外",
];

static ENGLISH_NAVIGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:log\s?in|sign\s?in|sign\s?up|register|home|homepage|settings|help)\b")
        .unwrap()
});

static ORDINAL_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"第.+[章节回]|(?i)\b(?:chapter|ch\.)\s*\d+").unwrap()
});

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.?\s*\D+").unwrap());

static ENGLISH_SPECIAL_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:prologue|preface|foreword|interlude|afterword|epilogue|extra|bonus)\b")
        .unwrap()
});

/// Why a link was accepted or rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LinkReason {
    /// Text contains a navigation word (login, register, home, ...)
    Blocklisted,
    /// Trimmed text is shorter than two characters
    TooShort,
    /// Text matches a "chapter N" pattern
    OrdinalMarker,
    /// Text starts with a number followed by other content
    LeadingNumber,
    /// Text names a prologue, afterword, extra or similar section
    SpecialSection,
    /// Target's final path segment is numeric with a page-file suffix
    NumericPath,
    /// No rule matched
    NoMatch,
}

impl LinkReason {
    /// Stable short name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocklisted => "blocklisted",
            Self::TooShort => "too-short",
            Self::OrdinalMarker => "ordinal-marker",
            Self::LeadingNumber => "leading-number",
            Self::SpecialSection => "special-section",
            Self::NumericPath => "numeric-path",
            Self::NoMatch => "no-match",
        }
    }
}

impl fmt::Display for LinkReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkClassification {
    pub is_chapter: bool,
    pub reason: LinkReason,
}

impl LinkClassification {
    fn accept(reason: LinkReason) -> Self {
        Self {
            is_chapter: true,
            reason,
        }
    }

    fn reject(reason: LinkReason) -> Self {
        Self {
            is_chapter: false,
            reason,
        }
    }
}

/// Classifies a link by its visible text and target reference
///
/// # Rules (first match wins)
///
/// 1. Navigation words → rejected
/// 2. Trimmed text shorter than 2 characters → rejected
/// 3. "第N章" / "Chapter N" → accepted (`ordinal-marker`)
/// 4. Leading digits followed by non-digit content → accepted (`leading-number`)
/// 5. Prologue/afterword/extra markers → accepted (`special-section`)
/// 6. Numeric final path segment with a page suffix → accepted (`numeric-path`)
/// 7. Otherwise rejected
///
/// # Examples
///
/// ```
/// use shiori::chapter::{classify, LinkReason};
///
/// let result = classify("第十二章 风起", "/b/42/1088.html");
/// assert!(result.is_chapter);
/// assert_eq!(result.reason, LinkReason::OrdinalMarker);
///
/// assert!(!classify("首页", "/").is_chapter);
/// ```
pub fn classify(visible_text: &str, target_reference: &str) -> LinkClassification {
    let text = visible_text.trim();

    if CJK_NAVIGATION_WORDS.iter().any(|word| text.contains(word))
        || ENGLISH_NAVIGATION.is_match(text)
    {
        return LinkClassification::reject(LinkReason::Blocklisted);
    }

    if text.chars().count() < 2 {
        return LinkClassification::reject(LinkReason::TooShort);
    }

    if ORDINAL_MARKER.is_match(text) {
        return LinkClassification::accept(LinkReason::OrdinalMarker);
    }

    if LEADING_NUMBER.is_match(text) {
        return LinkClassification::accept(LinkReason::LeadingNumber);
    }

    if CJK_SPECIAL_SECTIONS.iter().any(|marker| text.contains(marker))
        || ENGLISH_SPECIAL_SECTION.is_match(text)
    {
        return LinkClassification::accept(LinkReason::SpecialSection);
    }

    if is_numeric_page_reference(target_reference) {
        return LinkClassification::accept(LinkReason::NumericPath);
    }

    LinkClassification::reject(LinkReason::NoMatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocklist_wins_over_numeric_path() {
        let result = classify("用户登录", "/b/42/1088.html");
        assert!(!result.is_chapter);
        assert_eq!(result.reason, LinkReason::Blocklisted);

        let result = classify("Home", "/b/42/1.html");
        assert_eq!(result.reason, LinkReason::Blocklisted);
    }

    #[test]
    fn test_english_blocklist_matches_whole_words_only() {
        assert_eq!(classify("Log in", "/login").reason, LinkReason::Blocklisted);
        assert_eq!(classify("Help", "/help").reason, LinkReason::Blocklisted);

        let result = classify("Chapter 3: Homecoming", "/b/3.html");
        assert!(result.is_chapter);
        assert_eq!(result.reason, LinkReason::OrdinalMarker);
    }

    #[test]
    fn test_too_short() {
        let result = classify(" 1 ", "/b/42/1.html");
        assert!(!result.is_chapter);
        assert_eq!(result.reason, LinkReason::TooShort);
    }

    #[test]
    fn test_ordinal_marker() {
        assert_eq!(classify("第一章 开端", "/x").reason, LinkReason::OrdinalMarker);
        assert_eq!(classify("第12节", "/x").reason, LinkReason::OrdinalMarker);
        assert_eq!(classify("第三回 夜宴", "/x").reason, LinkReason::OrdinalMarker);
        assert_eq!(classify("Chapter 7", "/x").reason, LinkReason::OrdinalMarker);
        assert_eq!(classify("ch. 12", "/x").reason, LinkReason::OrdinalMarker);
    }

    #[test]
    fn test_leading_number() {
        let result = classify("12. The Storm", "/read?id=12");
        assert!(result.is_chapter);
        assert_eq!(result.reason, LinkReason::LeadingNumber);

        // Digits only is not a title
        assert_eq!(classify("2024", "/x").reason, LinkReason::NoMatch);
    }

    #[test]
    fn test_special_section() {
        assert_eq!(classify("楔子", "/x").reason, LinkReason::SpecialSection);
        assert_eq!(classify("番外 一", "/x").reason, LinkReason::SpecialSection);
        assert_eq!(classify("Prologue", "/x").reason, LinkReason::SpecialSection);
        assert_eq!(
            classify("Bonus: Summer", "/x").reason,
            LinkReason::SpecialSection
        );
        assert_eq!(classify("Extraordinary", "/x").reason, LinkReason::NoMatch);
    }

    #[test]
    fn test_numeric_path_accepts_ambiguous_titles() {
        let result = classify("风起", "/b/42/1088.html");
        assert!(result.is_chapter);
        assert_eq!(result.reason, LinkReason::NumericPath);
    }

    #[test]
    fn test_no_match() {
        let result = classify("排行榜", "/top/");
        assert!(!result.is_chapter);
        assert_eq!(result.reason, LinkReason::NoMatch);
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(LinkReason::OrdinalMarker.to_string(), "ordinal-marker");
        assert_eq!(LinkReason::NumericPath.to_string(), "numeric-path");
    }
}
