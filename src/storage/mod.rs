//! Storage module for persisting acquired chapters
//!
//! This module handles everything the harvester writes to disk:
//! - One Markdown file per chapter under a per-novel directory
//! - The JSON progress snapshot used for checkpoint and resume
//!
//! It also defines the durable record types shared by both.

mod files;
mod progress;
mod traits;

pub use files::{sanitize_filename, FileStorage};
pub use progress::ProgressStore;
pub use traits::{Storage, StorageError, StorageResult};

use crate::chapter::{order, ChapterCandidate};
use crate::url::canonical_key;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One acquired chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRecord {
    pub title: String,

    /// Cleaned prose
    pub body: String,

    pub source_location: String,

    #[serde(default)]
    pub previous_location: Option<String>,

    #[serde(default)]
    pub next_location: Option<String>,

    #[serde(default)]
    pub index_location: Option<String>,

    pub novel_name: String,
    pub author: String,
    pub category: String,

    /// Position in the best-known order, assigned when a snapshot is written
    #[serde(default)]
    pub sequence_index: Option<usize>,

    /// File name the chapter sink wrote the chapter to
    #[serde(default)]
    pub stored_filename: Option<String>,
}

impl ChapterRecord {
    /// The (title, location) pair the ordering engine works on
    pub fn candidate(&self) -> ChapterCandidate {
        ChapterCandidate::new(self.title.clone(), self.source_location.clone())
    }
}

/// Durable snapshot of a run's progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub novel_name: String,
    pub author: String,

    /// Every accumulated chapter, each carrying its sequence index
    pub chapters: Vec<ChapterRecord>,

    /// Last location the run processed
    #[serde(default)]
    pub last_location: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl ProgressSnapshot {
    /// Creates a snapshot from chapters already in their best-known order
    ///
    /// Sequence indices are (re)assigned from each chapter's position.
    pub fn new(
        novel_name: impl Into<String>,
        author: impl Into<String>,
        mut chapters: Vec<ChapterRecord>,
        last_location: Option<String>,
    ) -> Self {
        for (index, chapter) in chapters.iter_mut().enumerate() {
            chapter.sequence_index = Some(index);
        }

        Self {
            novel_name: novel_name.into(),
            author: author.into(),
            chapters,
            last_location,
            timestamp: Utc::now(),
        }
    }

    /// Canonical keys of every chapter location in the snapshot
    pub fn seen_locations(&self) -> HashSet<String> {
        self.chapters
            .iter()
            .map(|chapter| canonical_key(&chapter.source_location))
            .collect()
    }
}

/// Orders chapter records with the ordering engine
///
/// Records sharing a canonical location collapse to the first occurrence.
pub fn order_records(records: Vec<ChapterRecord>) -> Vec<ChapterRecord> {
    let candidates: Vec<ChapterCandidate> = records.iter().map(ChapterRecord::candidate).collect();

    let mut by_location: HashMap<String, ChapterRecord> = HashMap::with_capacity(records.len());
    for record in records {
        by_location
            .entry(canonical_key(&record.source_location))
            .or_insert(record);
    }

    order(&candidates)
        .iter()
        .filter_map(|candidate| by_location.remove(&canonical_key(&candidate.location)))
        .collect()
}
