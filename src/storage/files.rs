//! File-backed chapter storage
//!
//! Each chapter becomes `<root>/<novel>/<NNN>_<title>.md`, where `NNN` is the
//! zero-padded count of files already in the novel directory plus one.

use crate::storage::traits::{Storage, StorageResult};
use crate::storage::ChapterRecord;
use std::fs;
use std::path::{Path, PathBuf};

/// Characters that are not allowed in file names on common platforms
const INVALID_FILENAME_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Replaces characters that are invalid in file names with `_`
///
/// An empty (or whitespace-only) name becomes `unknown`.
pub fn sanitize_filename(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return "unknown".to_string();
    }

    trimmed
        .chars()
        .map(|c| {
            if INVALID_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Chapter sink writing Markdown files under a root directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Creates a storage rooted at `root`; directories are created lazily
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one novel's chapter files
    pub fn novel_dir(&self, novel_name: &str) -> PathBuf {
        self.root.join(sanitize_filename(novel_name))
    }
}

impl Storage for FileStorage {
    fn store_chapter(&mut self, record: &mut ChapterRecord) -> StorageResult<PathBuf> {
        let dir = self.novel_dir(&record.novel_name);
        fs::create_dir_all(&dir)?;

        let position = self.stored_count(&record.novel_name)? + 1;
        let filename = format!("{:03}_{}.md", position, sanitize_filename(&record.title));
        let path = dir.join(&filename);

        fs::write(&path, format!("# {}\n\n{}\n", record.title, record.body))?;
        tracing::debug!("Saved {}", path.display());

        record.stored_filename = Some(filename);
        Ok(path)
    }

    fn stored_count(&self, novel_name: &str) -> StorageResult<usize> {
        let dir = self.novel_dir(novel_name);
        if !dir.exists() {
            return Ok(0);
        }

        let mut count = 0;
        for entry in fs::read_dir(&dir)? {
            if entry?.file_type()?.is_file() {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::record;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("第一章: 开端?"), "第一章_ 开端_");
        assert_eq!(sanitize_filename(r#"a/b\c*d"e<f>g|h"#), "a_b_c_d_e_f_g_h");
        assert_eq!(sanitize_filename("   "), "unknown");
        assert_eq!(sanitize_filename(""), "unknown");
    }

    #[test]
    fn test_store_chapter_numbers_files() {
        let temp = TempDir::new().unwrap();
        let mut storage = FileStorage::new(temp.path());

        let mut first = record("第一章", "https://example.com/b/1.html");
        let mut second = record("第二章: 风起", "https://example.com/b/2.html");

        let first_path = storage.store_chapter(&mut first).unwrap();
        let second_path = storage.store_chapter(&mut second).unwrap();

        assert_eq!(first.stored_filename.as_deref(), Some("001_第一章.md"));
        assert_eq!(second.stored_filename.as_deref(), Some("002_第二章_ 风起.md"));
        assert!(first_path.exists());
        assert!(second_path.starts_with(temp.path().join("Novel")));

        let content = fs::read_to_string(first_path).unwrap();
        assert!(content.starts_with("# 第一章\n\n"));
        assert!(content.contains("Body of 第一章"));

        assert_eq!(storage.stored_count("Novel").unwrap(), 2);
        assert_eq!(storage.stored_count("Other").unwrap(), 0);
    }
}
