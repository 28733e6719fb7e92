//! Storage traits and error types
//!
//! This module defines the trait interface for chapter sinks and the
//! associated error types.

use crate::storage::ChapterRecord;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid progress snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for chapter sink implementations
///
/// A sink persists each acquired chapter under a per-novel namespace. It is
/// owned by the orchestrator's control flow, so implementations need not be
/// shareable between tasks.
pub trait Storage {
    /// Persists one chapter
    ///
    /// Implementations record where the chapter went in
    /// `record.stored_filename`.
    ///
    /// # Returns
    ///
    /// The path the chapter was written to
    fn store_chapter(&mut self, record: &mut ChapterRecord) -> StorageResult<PathBuf>;

    /// Number of chapters already stored for a novel
    fn stored_count(&self, novel_name: &str) -> StorageResult<usize>;
}
