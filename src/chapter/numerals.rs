//! Chapter numbers in free-text titles
//!
//! Titles on serial-novel sites carry their chapter number in several shapes:
//! `第12章`, `第十二章`, `12章`, `Chapter 12`, `12. The Storm`. Arabic digits
//! (including fullwidth ones) parse exactly, as do single CJK numerals and the
//! "ten plus digit" compounds `十一`..`十九`. Any other CJK numeral inside a
//! chapter marker is still a chapter number, just one we do not evaluate; it
//! maps to [`UNPARSED_NUMERAL`] so it sorts late but ahead of titles with no
//! number at all.

use regex::Regex;
use std::sync::LazyLock;

/// Ordinal assigned to chapter markers whose CJK numeral is too complex to evaluate
pub const UNPARSED_NUMERAL: u32 = 999;

static CJK_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"第([一二三四五六七八九十百千万零\d]+)章").unwrap());

static DIGIT_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)[章节]").unwrap());

static ENGLISH_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:chapter|ch\.)\s*(\d+)").unwrap());

static LEADING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)[\s.:：、]").unwrap());

static FIRST_CHAPTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"第(?:一|1|１)章|(?i)\bchapter\s*0*1\b").unwrap()
});

/// Value of a single CJK numeral character
fn cjk_digit(c: char) -> Option<u32> {
    let value = match c {
        '零' => 0,
        '一' => 1,
        '二' => 2,
        '三' => 3,
        '四' => 4,
        '五' => 5,
        '六' => 6,
        '七' => 7,
        '八' => 8,
        '九' => 9,
        '十' => 10,
        '百' => 100,
        '千' => 1000,
        '万' => 10000,
        _ => return None,
    };
    Some(value)
}

/// Replaces fullwidth digits with their ASCII forms
fn normalize_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Evaluates the numeral captured between `第` and `章`
fn evaluate_marker(numeral: &str) -> u32 {
    if numeral.chars().all(|c| c.is_ascii_digit()) {
        return numeral.parse().unwrap_or(UNPARSED_NUMERAL);
    }

    let chars: Vec<char> = numeral.chars().collect();
    match chars.as_slice() {
        [single] => cjk_digit(*single).unwrap_or(UNPARSED_NUMERAL),
        ['十', unit] => match cjk_digit(*unit) {
            Some(value @ 1..=9) => 10 + value,
            _ => UNPARSED_NUMERAL,
        },
        _ => UNPARSED_NUMERAL,
    }
}

/// Parses the chapter number carried by a title
///
/// # Cascade (first match wins)
///
/// 1. `第<numeral>章` with Arabic or CJK numerals
/// 2. `<digits>章` / `<digits>节`
/// 3. `Chapter <digits>` / `Ch. <digits>`
/// 4. Leading digits followed by a separator (`12. Title`, `3 Title`)
///
/// # Examples
///
/// ```
/// use shiori::chapter::numerals::{title_ordinal, UNPARSED_NUMERAL};
///
/// assert_eq!(title_ordinal("第十二章 风起"), Some(12));
/// assert_eq!(title_ordinal("第二十三章"), Some(UNPARSED_NUMERAL));
/// assert_eq!(title_ordinal("12. The Storm"), Some(12));
/// assert_eq!(title_ordinal("Intro"), None);
/// ```
pub fn title_ordinal(title: &str) -> Option<u32> {
    let title = normalize_digits(title);

    if let Some(caps) = CJK_MARKER.captures(&title) {
        return Some(evaluate_marker(&caps[1]));
    }

    if let Some(caps) = DIGIT_MARKER.captures(&title) {
        return caps[1].parse().ok();
    }

    if let Some(caps) = ENGLISH_MARKER.captures(&title) {
        return caps[1].parse().ok();
    }

    LEADING_DIGITS
        .captures(&title)
        .and_then(|caps| caps[1].parse().ok())
}

/// Returns true if the title explicitly names the first chapter
pub fn denotes_first_chapter(title: &str) -> bool {
    FIRST_CHAPTER.is_match(title)
}
