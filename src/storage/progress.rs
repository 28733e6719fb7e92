//! JSON progress snapshot persistence
//!
//! The Progress Store is the sole reader and writer of the snapshot file.
//! Writes go to a sibling temporary file which is then renamed over the
//! snapshot, so an interrupted write never leaves a truncated document.

use crate::storage::traits::{StorageError, StorageResult};
use crate::storage::{order_records, ProgressSnapshot};
use std::fs;
use std::path::{Path, PathBuf};

/// Reads and writes one progress snapshot file
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if a snapshot file exists
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Loads the snapshot, if one has been written
    ///
    /// Chapters come back in reading order: by their stored sequence index
    /// when every chapter carries one, otherwise as ordered by the ordering
    /// engine.
    ///
    /// # Errors
    ///
    /// * `StorageError::Io` - The file exists but could not be read
    /// * `StorageError::Serialization` - The file is not a valid snapshot
    /// * `StorageError::InvalidSnapshot` - Two chapters claim the same index
    pub fn load(&self) -> StorageResult<Option<ProgressSnapshot>> {
        if !self.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        let mut snapshot: ProgressSnapshot = serde_json::from_str(&content)?;

        let all_indexed = snapshot
            .chapters
            .iter()
            .all(|chapter| chapter.sequence_index.is_some());

        if all_indexed {
            snapshot.chapters.sort_by_key(|chapter| chapter.sequence_index);
            let duplicated = snapshot
                .chapters
                .windows(2)
                .any(|pair| pair[0].sequence_index == pair[1].sequence_index);
            if duplicated {
                return Err(StorageError::InvalidSnapshot(format!(
                    "duplicate sequence index in {}",
                    self.path.display()
                )));
            }
        } else {
            tracing::debug!("Snapshot chapters lack sequence indices, re-deriving order");
            snapshot.chapters = order_records(std::mem::take(&mut snapshot.chapters));
        }

        tracing::info!(
            "Loaded progress for {} ({} chapters) from {}",
            snapshot.novel_name,
            snapshot.chapters.len(),
            self.path.display()
        );

        Ok(Some(snapshot))
    }

    /// Writes the snapshot as pretty-printed JSON
    pub fn save(&self, snapshot: &ProgressSnapshot) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &self.path)?;

        tracing::debug!(
            "Progress saved to {} ({} chapters)",
            self.path.display(),
            snapshot.chapters.len()
        );
        Ok(())
    }
}
