//! Page fetching
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests returning the page markup
//! - Error classification into [`FetchError`]
//! - Charset detection from the Content-Type header or a `<meta>` declaration
//!
//! The orchestrator only sees the [`PageFetcher`] trait, so a rendering
//! backend or an in-memory fake can stand in for the HTTP implementation.

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use reqwest::{redirect::Policy, Client};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// How much of a body is searched for a `<meta>` charset declaration
const CHARSET_SNIFF_LIMIT: usize = 2048;

/// `<meta charset=...>` and `<meta http-equiv content="...; charset=...">`
static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*?charset\s*=\s*["']?\s*([A-Za-z0-9_:.\-]+)"#).unwrap()
});

/// Failure to obtain the markup of a single location
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {message}")]
    Http { url: String, message: String },

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {0}")]
    Timeout(String),

    #[error("Connection failed for {0}")]
    Connect(String),

    #[error("Unexpected content type {content_type} for {url}")]
    ContentMismatch { url: String, content_type: String },
}

/// Source of rendered page markup
///
/// Implementations may execute JavaScript, cache, or serve canned pages; the
/// orchestrator treats every call as an opaque suspension point.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the markup served at `url`
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use shiori::config::UserAgentConfig;
/// use shiori::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`PageFetcher`] backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with a freshly built client
    pub fn new(config: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config, timeout)?,
        })
    }

    /// Wraps an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    /// Fetches a page with error classification
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx with an HTML or text body | `Ok(markup)` |
    /// | Non-2xx status | `Status` |
    /// | Non-text Content-Type | `ContentMismatch` |
    /// | Timeout | `Timeout` |
    /// | Connection refused / TLS failure | `Connect` |
    /// | Anything else | `Http` |
    ///
    /// No retries happen here; a failed chapter is simply absent from the run.
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        tracing::trace!("GET {}", url);

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if let Some(content_type) = &content_type {
            if !is_markup_content_type(content_type) {
                return Err(FetchError::ContentMismatch {
                    url: url.to_string(),
                    content_type: content_type.clone(),
                });
            }
        }

        let body = response.bytes().await.map_err(|e| classify_error(url, e))?;
        Ok(decode_markup(&body, content_type.as_deref()))
    }
}

/// Decodes a markup body to text
///
/// The charset comes from the Content-Type header, then from a `<meta>`
/// declaration near the top of the document, then defaults to UTF-8. A byte
/// order mark overrides all of them.
///
/// # Arguments
///
/// * `body` - Raw response bytes
/// * `content_type` - The Content-Type header value, if any
pub fn decode_markup(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(header_charset)
        .or_else(|| meta_charset(body))
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);

    let (text, used, had_errors) = encoding.decode(body);
    if had_errors {
        tracing::debug!("Body contained bytes invalid in {}", used.name());
    }
    text.into_owned()
}

/// Charset parameter of a Content-Type value
fn header_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Charset declared by a `<meta>` tag in the first bytes of the body
fn meta_charset(body: &[u8]) -> Option<String> {
    let head = &body[..body.len().min(CHARSET_SNIFF_LIMIT)];
    let head = String::from_utf8_lossy(head);
    META_CHARSET
        .captures(&head)
        .map(|captures| captures[1].to_string())
}

fn is_markup_content_type(content_type: &str) -> bool {
    let lowered = content_type.to_ascii_lowercase();
    lowered.contains("text/") || lowered.contains("html")
}

fn classify_error(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else if error.is_connect() {
        FetchError::Connect(url.to_string())
    } else {
        FetchError::Http {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
