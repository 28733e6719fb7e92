//! Chapter discovery and ordering
//!
//! This module contains the heuristics that turn a listing page into an
//! ordered chapter index:
//! - Link classification (is this anchor a chapter link, and why)
//! - Title numeral parsing (Arabic and CJK chapter numbers)
//! - Chapter list region detection on listing pages
//! - Index resolution, including first-chapter probing
//! - Deterministic multi-key ordering with location deduplication

mod classifier;
pub mod numerals;
mod ordering;
mod region;
mod resolver;

pub use classifier::{classify, LinkClassification, LinkReason};
pub use numerals::title_ordinal;
pub use ordering::{order, rank, RankedChapter};
pub use region::{locate_region, RegionSource};
pub use resolver::{extract_identity, ChapterIndexResolver};

use serde::{Deserialize, Serialize};

/// Sentinel used when a novel name, author or category cannot be found
pub const UNKNOWN: &str = "unknown";

/// A (title, location) pair believed to reference one installment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterCandidate {
    /// Visible link text or extracted page title
    pub title: String,

    /// Absolute location of the chapter page
    pub location: String,
}

impl ChapterCandidate {
    /// Creates a new candidate
    pub fn new(title: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            location: location.into(),
        }
    }
}

/// The resolved table of contents of one novel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NovelIndex {
    /// Novel name, or [`UNKNOWN`]
    pub novel_name: String,

    /// Author name, or [`UNKNOWN`]
    pub author: String,

    /// Chapters in reading order
    pub ordered_chapters: Vec<ChapterCandidate>,
}

impl NovelIndex {
    /// Number of chapters in the index
    pub fn len(&self) -> usize {
        self.ordered_chapters.len()
    }

    /// Returns true if the index holds no chapters
    pub fn is_empty(&self) -> bool {
        self.ordered_chapters.is_empty()
    }

    /// Position of the chapter at exactly this location, if listed
    pub fn position_of(&self, location: &str) -> Option<usize> {
        self.ordered_chapters
            .iter()
            .position(|chapter| chapter.location == location)
    }
}
