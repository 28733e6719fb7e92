//! Crawler module for chapter acquisition
//!
//! This module contains the acquisition machinery, including:
//! - HTTP fetching behind the `PageFetcher` seam
//! - Chapter page content extraction
//! - Concurrency limiting and politeness pacing
//! - System load sampling while chapters are fetched
//! - Run coordination across index-driven and linked-list modes

mod coordinator;
mod fetcher;
mod monitor;
pub mod parser;
mod scheduler;

pub use coordinator::{Coordinator, RunOptions};
pub use fetcher::{build_http_client, decode_markup, FetchError, HttpFetcher, PageFetcher};
pub use monitor::ResourceMonitor;
pub use parser::{
    extract_body, extract_links, extract_metadata, extract_navigation, extract_title,
    parse_chapter_page, ExtractionError, Navigation, PageMetadata,
};
pub use scheduler::{FetchLimiter, Pacing};
