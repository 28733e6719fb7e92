//! Shared fixtures: an in-memory page fetcher and page builders

use async_trait::async_trait;
use shiori::config::Config;
use shiori::crawler::{FetchError, Pacing, PageFetcher, RunOptions};
use shiori::storage::{FileStorage, ProgressStore};
use shiori::Coordinator;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;

pub const BOOK: &str = "https://novel.test/book/";

pub fn chapter_url(n: u32) -> String {
    format!("{}{}.html", BOOK, n)
}

/// Serves canned pages, recording requests and peak concurrency
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// Highest number of fetches observed in flight at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// A chapter page with optional next and index links
pub fn chapter_page(n: u32, next: Option<&str>, index: Option<&str>) -> String {
    let next = next
        .map(|href| format!(r#"<a href="{}">下一章</a>"#, href))
        .unwrap_or_default();
    let index = index
        .map(|href| format!(r#"<a href="{}">目录</a>"#, href))
        .unwrap_or_default();

    format!(
        r#"<html><head><title>第{n}章 归途_星河_小说网</title>
        <meta property="og:novel:book_name" content="星河">
        <meta property="og:novel:author" content="青山"></head>
        <body><h1>第{n}章 归途</h1>
        <div id="content">第{n}章：夜色降临，城门缓缓关闭。<br>少年背着行囊站在雨中，等待天明。</div>
        <div class="nav">{index}{next}</div></body></html>"#,
        n = n,
        index = index,
        next = next
    )
}

/// A listing page linking chapters `1..=count` with relative references
pub fn listing_page(count: u32) -> String {
    let links: String = (1..=count)
        .map(|n| format!(r#"<dd><a href="/book/{n}.html">第{n}章 归途</a></dd>"#, n = n))
        .collect();

    format!(
        r#"<html><head><title>星河最新章节_星河全文阅读</title></head><body>
        <div class="top"><a href="/">首页</a><a href="/login">登录</a></div>
        <p>作者：青山</p>
        <div id="list"><dl>{}</dl></div></body></html>"#,
        links
    )
}

/// A site with a listing and `count` chained chapters
pub fn novel_site(count: u32) -> FakeFetcher {
    let mut fetcher = FakeFetcher::new().page(BOOK, listing_page(count));
    for n in 1..=count {
        let next = (n < count).then(|| chapter_url(n + 1));
        fetcher = fetcher.page(chapter_url(n), chapter_page(n, next.as_deref(), Some(BOOK)));
    }
    fetcher
}

/// Run options for tests: no pacing, output under `temp`
pub fn options(entry: &str, temp: &TempDir) -> RunOptions {
    let mut options = RunOptions::from_config(Url::parse(entry).unwrap(), &Config::default()).unwrap();
    options.pacing = Pacing::none();
    options.output_dir = temp.path().join("novels");
    options
}

pub fn progress_store(temp: &TempDir) -> ProgressStore {
    ProgressStore::new(temp.path().join("progress.json"))
}

pub fn coordinator(fetcher: Arc<FakeFetcher>, temp: &TempDir, options: RunOptions) -> Coordinator {
    Coordinator::new(
        fetcher,
        Box::new(FileStorage::new(temp.path().join("novels"))),
        progress_store(temp),
        options,
    )
}
