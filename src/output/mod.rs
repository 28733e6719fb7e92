//! Output module for the merged export and run reports
//!
//! This module handles:
//! - Merging ordered chapters into one Markdown document with a table of contents
//! - Summarizing a finished run for the terminal

mod markdown;
pub mod stats;

pub use markdown::{export_path, format_export, write_export};
pub use stats::{print_report, RunReport};
