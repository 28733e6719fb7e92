/// Run phase definitions for one acquisition run
///
/// This module defines the phases a run moves through and which moves between
/// them are legal.
use crate::url::PageKind;
use std::fmt;

/// Represents the current phase of an acquisition run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    // ===== Setup =====
    /// Determining the entry mode from the starting location
    Bootstrapping,

    // ===== Acquisition Modes =====
    /// Crawling a resolved, ordered chapter list with a worker pool
    IndexDriven,

    /// Following "next chapter" references one page at a time
    LinkedList,

    // ===== Wind-down =====
    /// Merging emitted records with resumed ones and writing the final snapshot
    Draining,

    /// Ordered records handed to the export collaborator
    Finalized,
}

impl RunPhase {
    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// `Bootstrapping → IndexDriven | LinkedList → Draining → Finalized`
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        matches!(
            (self, next),
            (Self::Bootstrapping, Self::IndexDriven)
                | (Self::Bootstrapping, Self::LinkedList)
                | (Self::IndexDriven, Self::Draining)
                | (Self::LinkedList, Self::Draining)
                | (Self::Draining, Self::Finalized)
        )
    }

    /// Returns true for the two acquisition modes
    pub fn is_acquiring(&self) -> bool {
        matches!(self, Self::IndexDriven | Self::LinkedList)
    }

    /// Returns true once the run has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized)
    }

    /// Converts the phase to its log/report string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bootstrapping => "bootstrapping",
            Self::IndexDriven => "index-driven",
            Self::LinkedList => "linked-list",
            Self::Draining => "draining",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the caller's starting location points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A table of contents
    Listing,
    /// A single chapter
    Chapter,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Chapter => "chapter",
        }
    }
}

impl From<PageKind> for EntryKind {
    fn from(kind: PageKind) -> Self {
        match kind {
            PageKind::Listing => Self::Listing,
            PageKind::Chapter => Self::Chapter,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
