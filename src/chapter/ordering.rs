//! Chapter Ordering Engine
//!
//! Computes a deterministic total order over chapter candidates whose only
//! identifying signals are numeric hints embedded in their locations and
//! titles. Location identifiers are trusted most; title numbers are a
//! secondary signal because they are frequently wrong, translated or absent.
//!
//! Sort key, ascending:
//! `location_ordinal` (absent = +inf) → `title_ordinal` (absent = +inf) →
//! `-priority` → `special_sequence` (unset after 3) → `original_position`.

use super::numerals::title_ordinal;
use super::ChapterCandidate;
use crate::url::{canonical_key, trailing_numeric_id};
use std::cmp::Reverse;
use std::collections::HashSet;

/// Title fragments marking front matter that precedes chapter one
const PREFACE_MARKERS: &[&str] = &["序", "前言", "楔子", "简介"];

/// English preface markers, matched case-insensitively
const PREFACE_MARKERS_EN: &[&str] = &["prologue", "preface", "foreword"];

/// Explicit first/second/third chapter titles, checked alongside parsed ordinals
const EXPLICIT_OPENERS: [&str; 3] = ["第一章", "第二章", "第三章"];

/// Sort position of a candidate with no special sequence
const UNSET_SEQUENCE: u8 = 4;

/// A candidate annotated with every ordering signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedChapter {
    pub candidate: ChapterCandidate,

    /// Numeric id from the trailing path segment (`.../1088.html` → 1088)
    pub location_ordinal: Option<u64>,

    /// Chapter number parsed from the title
    pub title_ordinal: Option<u32>,

    /// 0 for preface-like titles, 1..=3 for explicit opening chapters
    pub special_sequence: Option<u8>,

    /// Weighted score; higher sorts earlier among otherwise equal keys
    pub priority: i64,

    /// Position in the input sequence, the final tie-break
    pub original_position: usize,
}

impl RankedChapter {
    fn sort_key(&self) -> (u64, u32, Reverse<i64>, u8, usize) {
        (
            self.location_ordinal.unwrap_or(u64::MAX),
            self.title_ordinal.unwrap_or(u32::MAX),
            Reverse(self.priority),
            self.special_sequence.unwrap_or(UNSET_SEQUENCE),
            self.original_position,
        )
    }
}

fn is_preface(title: &str) -> bool {
    if PREFACE_MARKERS.iter().any(|marker| title.contains(marker)) {
        return true;
    }
    let lowered = title.to_lowercase();
    PREFACE_MARKERS_EN
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Matches the n-th opening chapter (1-based, n <= 3) by location or title
fn is_opener(n: usize, location: Option<u64>, title_number: Option<u32>, title: &str) -> bool {
    location == Some(n as u64)
        || title_number == Some(n as u32)
        || title.contains(EXPLICIT_OPENERS[n - 1])
}

fn special_sequence(title: &str, location: Option<u64>, title_number: Option<u32>) -> Option<u8> {
    if is_preface(title) {
        return Some(0);
    }
    (1..=3)
        .find(|&n| is_opener(n, location, title_number, title))
        .map(|n| n as u8)
}

fn priority(title: &str, location: Option<u64>, title_number: Option<u32>) -> i64 {
    // Opening chapters by location id, or by title when the location has none
    for (n, score) in [(1u64, 1000), (2, 900), (3, 800)] {
        let by_title = location.is_none() && title.contains(EXPLICIT_OPENERS[n as usize - 1]);
        if location == Some(n) || by_title {
            return score;
        }
    }

    match location {
        Some(id) if id > 0 && id < 10 => return 700 - id as i64,
        _ => {}
    }

    if is_preface(title) {
        return 500;
    }

    match (location, title_number) {
        (Some(id), _) if id > 0 && id < 100 => 400 - id as i64,
        (_, Some(number)) if number > 0 && number < 100 => 300 - number as i64,
        _ => 0,
    }
}

/// Annotates candidates with their ordering signals, in input order
pub fn rank(candidates: &[ChapterCandidate]) -> Vec<RankedChapter> {
    candidates
        .iter()
        .enumerate()
        .map(|(position, candidate)| {
            let title = candidate.title.trim();
            let location_ordinal = trailing_numeric_id(&candidate.location);
            let title_number = title_ordinal(title);

            RankedChapter {
                candidate: candidate.clone(),
                location_ordinal,
                title_ordinal: title_number,
                special_sequence: special_sequence(title, location_ordinal, title_number),
                priority: priority(title, location_ordinal, title_number),
                original_position: position,
            }
        })
        .collect()
}

/// Orders chapter candidates deterministically
///
/// Candidates sharing a canonical location are collapsed to their first
/// occurrence before sorting. The sort is stable, so candidates with no
/// numeric evidence keep their relative input order, and applying `order`
/// to its own output returns it unchanged.
///
/// # Examples
///
/// ```
/// use shiori::chapter::{order, ChapterCandidate};
///
/// let ordered = order(&[
///     ChapterCandidate::new("Intro", "https://example.com/b/5.html"),
///     ChapterCandidate::new("第一章", "https://example.com/b/3.html"),
/// ]);
/// assert_eq!(ordered[0].location, "https://example.com/b/3.html");
/// ```
pub fn order(candidates: &[ChapterCandidate]) -> Vec<ChapterCandidate> {
    let mut seen = HashSet::new();
    let unique: Vec<ChapterCandidate> = candidates
        .iter()
        .filter(|candidate| seen.insert(canonical_key(&candidate.location)))
        .cloned()
        .collect();

    if unique.len() < candidates.len() {
        tracing::debug!(
            "Collapsed {} duplicate chapter locations",
            candidates.len() - unique.len()
        );
    }

    let mut ranked = rank(&unique);
    ranked.sort_by_key(RankedChapter::sort_key);

    for (i, chapter) in ranked.iter().take(5).enumerate() {
        tracing::debug!(
            "Ordered #{}: {} ({}) location={:?} title={:?} priority={}",
            i + 1,
            chapter.candidate.title,
            chapter.candidate.location,
            chapter.location_ordinal,
            chapter.title_ordinal,
            chapter.priority
        );
    }
    if ranked.len() > 5 {
        if let Some(last) = ranked.last() {
            tracing::debug!(
                "Ordered last #{}: {} ({})",
                ranked.len(),
                last.candidate.title,
                last.candidate.location
            );
        }
    }

    ranked.into_iter().map(|chapter| chapter.candidate).collect()
}
