//! State module for tracking run progress
//!
//! # Components
//!
//! - `RunPhase`: The phase of an acquisition run, with validated transitions
//! - `EntryKind`: Whether the starting location is a listing or a chapter page

mod run_phase;

// Re-export main types
pub use run_phase::{EntryKind, RunPhase};
