//! HTTP-level runs against a wiremock server

use crate::support::{chapter_page, listing_page};
use shiori::chapter::title_ordinal;
use shiori::config::UserAgentConfig;
use shiori::crawler::{HttpFetcher, PageFetcher};
use shiori::storage::{FileStorage, ProgressStore};
use shiori::{Coordinator, RunPhase};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

/// GBK-encoded page whose charset is declared only in a `<meta>` tag
fn gbk_html(body: String) -> ResponseTemplate {
    let body = body.replacen("<head>", r#"<head><meta charset="gbk">"#, 1);
    let (bytes, _, _) = encoding_rs::GBK.encode(&body);
    ResponseTemplate::new(200).set_body_raw(bytes.into_owned(), "text/html")
}

fn fetcher() -> Arc<HttpFetcher> {
    let user_agent = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    };
    Arc::new(HttpFetcher::new(&user_agent, Duration::from_secs(5)).unwrap())
}

fn coordinator(entry: &str, temp: &TempDir) -> Coordinator {
    Coordinator::new(
        fetcher(),
        Box::new(FileStorage::new(temp.path().join("novels"))),
        ProgressStore::new(temp.path().join("progress.json")),
        crate::support::options(entry, temp),
    )
}

#[tokio::test]
async fn test_index_driven_run_over_http() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/book/"))
        .respond_with(html(listing_page(3)))
        .mount(&server)
        .await;

    for n in 1..=3u32 {
        let next = (n < 3).then(|| format!("/book/{}.html", n + 1));
        Mock::given(method("GET"))
            .and(path(format!("/book/{}.html", n)))
            .respond_with(html(chapter_page(n, next.as_deref(), Some("/book/"))))
            .expect(1)
            .mount(&server)
            .await;
    }

    let temp = TempDir::new().unwrap();
    let mut coordinator = coordinator(&format!("{}/book/", base), &temp);
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.mode, RunPhase::IndexDriven);
    assert_eq!(report.novel_name, "星河");
    assert_eq!(report.author, "青山");
    assert_eq!(report.acquired, 3);
}

#[tokio::test]
async fn test_linked_list_run_over_http() {
    let server = MockServer::start().await;
    let base = server.uri();

    // No listing page: the index reference answers 404
    Mock::given(method("GET"))
        .and(path("/book/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    for n in 1..=3u32 {
        let next = (n < 3).then(|| format!("/book/{}.html", n + 1));
        Mock::given(method("GET"))
            .and(path(format!("/book/{}.html", n)))
            .respond_with(html(chapter_page(n, next.as_deref(), Some("/book/"))))
            .mount(&server)
            .await;
    }

    let temp = TempDir::new().unwrap();
    let mut coordinator = coordinator(&format!("{}/book/1.html", base), &temp);
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.mode, RunPhase::LinkedList);
    assert_eq!(report.acquired, 3);

    let export = std::fs::read_to_string(report.export_path.unwrap()).unwrap();
    assert!(export.contains("## 第3章 归途"));
}

#[tokio::test]
async fn test_non_markup_response_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/book/1.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8, 1, 2], "application/pdf"))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/book/1.pdf", server.uri())).unwrap();
    let result = fetcher().fetch(&url).await;

    assert!(matches!(
        result,
        Err(shiori::crawler::FetchError::ContentMismatch { .. })
    ));
}

#[tokio::test]
async fn test_gbk_page_with_meta_charset_is_decoded() {
    let server = MockServer::start().await;

    let page = "<html><head><title>第一章 开端_星河</title></head><body><h1>第一章 开端</h1></body></html>";
    Mock::given(method("GET"))
        .and(path("/book/1.html"))
        .respond_with(gbk_html(page.to_string()))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/book/1.html", server.uri())).unwrap();
    let markup = fetcher().fetch(&url).await.unwrap();

    assert!(markup.contains("<h1>第一章 开端</h1>"));
    let title = shiori::crawler::extract_title(&markup, "fallback");
    assert_eq!(title_ordinal(&title), Some(1));
}

#[tokio::test]
async fn test_index_driven_run_over_gbk_site() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/book/"))
        .respond_with(gbk_html(listing_page(3)))
        .mount(&server)
        .await;

    for n in 1..=3u32 {
        let next = (n < 3).then(|| format!("/book/{}.html", n + 1));
        Mock::given(method("GET"))
            .and(path(format!("/book/{}.html", n)))
            .respond_with(gbk_html(chapter_page(n, next.as_deref(), Some("/book/"))))
            .mount(&server)
            .await;
    }

    let temp = TempDir::new().unwrap();
    let mut coordinator = coordinator(&format!("{}/book/", server.uri()), &temp);
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.mode, RunPhase::IndexDriven);
    assert_eq!(report.novel_name, "星河");
    assert_eq!(report.author, "青山");
    assert_eq!(report.acquired, 3);

    let export = std::fs::read_to_string(report.export_path.unwrap()).unwrap();
    assert!(export.contains("## 第3章 归途"));
}
