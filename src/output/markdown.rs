//! Merged Markdown export
//!
//! This module merges a novel's ordered chapters into a single Markdown
//! document: title, author line, a numbered table of contents linking to
//! per-chapter anchors, then every chapter as its own section.

use crate::storage::{sanitize_filename, ChapterRecord};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Path of the merged export for a novel
///
/// # Arguments
///
/// * `output_dir` - Directory holding the export
/// * `novel_name` - Novel name, sanitized into the file name
pub fn export_path(output_dir: &Path, novel_name: &str) -> PathBuf {
    output_dir.join(format!("{}_full.md", sanitize_filename(novel_name)))
}

/// Writes the merged export and returns its path
///
/// `chapters` must already be in reading order.
///
/// # Returns
///
/// * `Ok(PathBuf)` - Location of the written document
/// * `Err(io::Error)` - Failed to create the directory or write the file
pub fn write_export(
    output_dir: &Path,
    novel_name: &str,
    author: &str,
    chapters: &[ChapterRecord],
) -> io::Result<PathBuf> {
    fs::create_dir_all(output_dir)?;

    let path = export_path(output_dir, novel_name);
    let markdown = format_export(novel_name, author, chapters);

    let mut file = File::create(&path)?;
    file.write_all(markdown.as_bytes())?;

    tracing::debug!("Wrote {} bytes to {}", markdown.len(), path.display());
    Ok(path)
}

/// Formats ordered chapters as one Markdown document
pub fn format_export(novel_name: &str, author: &str, chapters: &[ChapterRecord]) -> String {
    let mut md = String::new();

    md.push_str(&format!("# {}\n\n", novel_name));
    md.push_str(&format!("Author: {}\n\n", author));

    // Table of contents
    md.push_str("## Contents\n\n");
    for (i, chapter) in chapters.iter().enumerate() {
        md.push_str(&format!("{}. [{}](#chapter-{})\n", i + 1, chapter.title, i + 1));
    }
    md.push_str("\n---\n\n");

    for (i, chapter) in chapters.iter().enumerate() {
        md.push_str(&format!("<a id=\"chapter-{}\"></a>\n\n", i + 1));
        md.push_str(&format!("## {}\n\n", chapter.title));
        md.push_str(&format!("{}\n\n", chapter.body));
        md.push_str("---\n\n");
    }

    md
}
