use serde::Deserialize;

/// Main configuration structure for Shiori
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Acquisition behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Size of the worker pool in index-driven mode
    pub concurrency: u32,

    /// Lower bound of the randomized pacing delay (seconds)
    #[serde(rename = "pacing-min-secs")]
    pub pacing_min_secs: f64,

    /// Upper bound of the randomized pacing delay (seconds)
    #[serde(rename = "pacing-max-secs")]
    pub pacing_max_secs: f64,

    /// Maximum number of chapters to acquire (0 = unbounded)
    #[serde(rename = "chapter-budget")]
    pub chapter_budget: usize,

    /// Write a progress snapshot every N newly acquired chapters
    #[serde(rename = "checkpoint-interval")]
    pub checkpoint_interval: usize,

    /// Snapshot batch size while fetching from a chapter list
    #[serde(rename = "index-checkpoint-interval")]
    pub index_checkpoint_interval: usize,

    /// Minimum number of characters of extracted body text
    #[serde(rename = "minimum-content-length")]
    pub minimum_content_length: usize,

    /// Per-request timeout handed to the HTTP client (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Seconds between system load samples during acquisition (0 = off)
    #[serde(rename = "monitor-interval-secs")]
    pub monitor_interval_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            pacing_min_secs: 1.0,
            pacing_max_secs: 3.0,
            chapter_budget: 0,
            checkpoint_interval: 3,
            index_checkpoint_interval: 50,
            minimum_content_length: 20,
            request_timeout_secs: 30,
            monitor_interval_secs: 10,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "Shiori".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/shiori".to_string(),
            contact_email: "shiori@example.com".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving per-chapter files and the merged export
    pub directory: String,

    /// Path of the progress snapshot document
    #[serde(rename = "progress-file")]
    pub progress_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "novels".to_string(),
            progress_file: "progress.json".to_string(),
        }
    }
}
