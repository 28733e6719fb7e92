//! Run statistics
//!
//! This module provides the summary of a finished run and its terminal
//! rendering.

use crate::state::RunPhase;
use std::path::PathBuf;

/// Outcome of one acquisition run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub novel_name: String,
    pub author: String,

    /// Acquisition mode the run used
    pub mode: RunPhase,

    /// Chapters loaded from a prior snapshot
    pub resumed: usize,

    /// Chapters acquired by this run
    pub acquired: usize,

    /// Chapters that could not be fetched or had no usable body
    pub failed: usize,

    /// Chapters in the final merged set
    pub total: usize,

    /// Progress snapshots written, including the final one
    pub checkpoints: usize,

    /// Merged export, if anything was exported
    pub export_path: Option<PathBuf>,
}

impl RunReport {
    /// Percentage of attempted chapters that were acquired
    pub fn success_rate(&self) -> f64 {
        let attempted = self.acquired + self.failed;
        if attempted == 0 {
            return 0.0;
        }
        (self.acquired as f64 / attempted as f64) * 100.0
    }
}

/// Prints the report to stdout in a formatted manner
///
/// # Arguments
///
/// * `report` - The report to display
pub fn print_report(report: &RunReport) {
    println!("=== Run Summary ===\n");

    println!("Novel:");
    println!("  Title: {}", report.novel_name);
    println!("  Author: {}", report.author);
    println!("  Mode: {}", report.mode);
    println!();

    println!("Chapters:");
    if report.resumed > 0 {
        println!("  Resumed from snapshot: {}", report.resumed);
    }
    println!("  Acquired this run: {}", report.acquired);
    println!("  Failed: {}", report.failed);
    println!("  Total: {}", report.total);
    println!("  Checkpoints written: {}", report.checkpoints);
    println!();

    match &report.export_path {
        Some(path) => println!("Export: {}", path.display()),
        None => println!("Export: none (no chapters acquired)"),
    }

    println!(
        "Success Rate: {:.1}% ({} / {} chapters acquired)",
        report.success_rate(),
        report.acquired,
        report.acquired + report.failed
    );
}
