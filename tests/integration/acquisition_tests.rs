//! End-to-end acquisition scenarios against the in-memory fetcher

use crate::support::{
    chapter_page, chapter_url, coordinator, novel_site, options, progress_store, FakeFetcher,
    BOOK,
};
use shiori::storage::{ChapterRecord, ProgressSnapshot};
use shiori::{RunPhase, ShioriError};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn stored_record(n: u32, next: Option<u32>) -> ChapterRecord {
    ChapterRecord {
        title: format!("第{}章 归途", n),
        body: format!("第{}章：夜色降临，城门缓缓关闭。", n),
        source_location: chapter_url(n),
        previous_location: None,
        next_location: next.map(chapter_url),
        index_location: Some(BOOK.to_string()),
        novel_name: "星河".to_string(),
        author: "青山".to_string(),
        category: "unknown".to_string(),
        sequence_index: None,
        stored_filename: None,
    }
}

fn seed_snapshot(temp: &TempDir, chapters: u32, last: u32) {
    let records = (1..=chapters)
        .map(|n| stored_record(n, Some(n + 1)))
        .collect();
    let snapshot = ProgressSnapshot::new("星河", "青山", records, Some(chapter_url(last)));
    progress_store(temp).save(&snapshot).unwrap();
}

#[tokio::test]
async fn test_resume_skips_acquired_chapters() {
    let temp = TempDir::new().unwrap();
    seed_snapshot(&temp, 10, 10);

    let fetcher = Arc::new(novel_site(15));
    let mut run_options = options(BOOK, &temp);
    run_options.resume = true;
    let mut coordinator = coordinator(fetcher.clone(), &temp, run_options);

    let report = coordinator.run().await.unwrap();

    assert_eq!(report.mode, RunPhase::IndexDriven);
    assert_eq!(report.resumed, 10);
    assert_eq!(report.acquired, 5);
    assert_eq!(report.total, 15);

    let requests = fetcher.requests();
    for n in 1..=10 {
        assert!(!requests.contains(&chapter_url(n)), "chapter {} refetched", n);
    }
    for n in 11..=15 {
        assert!(requests.contains(&chapter_url(n)), "chapter {} not fetched", n);
    }

    let snapshot = progress_store(&temp).load().unwrap().unwrap();
    assert_eq!(snapshot.chapters.len(), 15);
    for (i, chapter) in snapshot.chapters.iter().enumerate() {
        assert_eq!(chapter.sequence_index, Some(i));
        assert_eq!(chapter.source_location, chapter_url(i as u32 + 1));
    }
}

#[tokio::test]
async fn test_linked_list_cycle_terminates() {
    let temp = TempDir::new().unwrap();
    let fetcher = Arc::new(
        FakeFetcher::new()
            .page(chapter_url(1), chapter_page(1, Some(&chapter_url(2)), None))
            .page(chapter_url(2), chapter_page(2, Some(&chapter_url(3)), None))
            .page(chapter_url(3), chapter_page(3, Some(&chapter_url(1)), None)),
    );
    let mut coordinator = coordinator(fetcher.clone(), &temp, options(&chapter_url(1), &temp));

    let report = coordinator.run().await.unwrap();

    assert_eq!(report.mode, RunPhase::LinkedList);
    assert_eq!(report.acquired, 3);
    assert_eq!(
        fetcher.requests(),
        vec![chapter_url(1), chapter_url(2), chapter_url(3)]
    );
}

#[tokio::test]
async fn test_linked_list_resumes_from_last_location() {
    let temp = TempDir::new().unwrap();
    seed_snapshot(&temp, 2, 2);

    // The listing is missing, so the run follows next links
    let mut fetcher = FakeFetcher::new();
    for n in 1..=5 {
        let next = (n < 5).then(|| chapter_url(n + 1));
        fetcher = fetcher.page(chapter_url(n), chapter_page(n, next.as_deref(), Some(BOOK)));
    }
    let fetcher = Arc::new(fetcher);

    let mut run_options = options(&chapter_url(1), &temp);
    run_options.resume = true;
    let mut coordinator = coordinator(fetcher.clone(), &temp, run_options);

    let report = coordinator.run().await.unwrap();

    assert_eq!(report.mode, RunPhase::LinkedList);
    assert_eq!(report.resumed, 2);
    assert_eq!(report.acquired, 3);
    assert_eq!(report.total, 5);

    let requests = fetcher.requests();
    assert!(!requests.contains(&chapter_url(2)));
    assert!(requests.contains(&chapter_url(5)));
}

#[tokio::test]
async fn test_resumed_walk_keeps_entry_chapter() {
    let temp = TempDir::new().unwrap();
    seed_snapshot(&temp, 2, 2);

    let mut fetcher = FakeFetcher::new();
    for n in 1..=5 {
        let next = (n < 5).then(|| chapter_url(n + 1));
        fetcher = fetcher.page(chapter_url(n), chapter_page(n, next.as_deref(), Some(BOOK)));
    }
    let fetcher = Arc::new(fetcher);

    // Entered at chapter 4, but the walk resumes after chapter 2
    let mut run_options = options(&chapter_url(4), &temp);
    run_options.resume = true;
    let mut coordinator = coordinator(fetcher.clone(), &temp, run_options);

    let report = coordinator.run().await.unwrap();

    assert_eq!(report.mode, RunPhase::LinkedList);
    assert_eq!(report.acquired, 3);
    assert_eq!(report.total, 5);

    let requests = fetcher.requests();
    let fetched = |n: u32| requests.iter().filter(|r| **r == chapter_url(n)).count();
    assert_eq!(fetched(4), 1);
    assert_eq!(fetched(3), 1);
    assert_eq!(fetched(5), 1);
    assert_eq!(fetched(2), 0);
}

#[tokio::test]
async fn test_concurrency_bound() {
    let temp = TempDir::new().unwrap();
    let fetcher = Arc::new(novel_site(5).with_latency(Duration::from_millis(30)));
    let mut run_options = options(BOOK, &temp);
    run_options.concurrency = 2;
    let mut coordinator = coordinator(fetcher.clone(), &temp, run_options);

    let report = coordinator.run().await.unwrap();

    assert_eq!(report.acquired, 5);
    assert_eq!(fetcher.peak(), 2);
}

#[tokio::test]
async fn test_checkpoint_failure_is_not_fatal() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let fetcher = Arc::new(novel_site(4));
    let mut coordinator = shiori::Coordinator::new(
        fetcher,
        Box::new(shiori::storage::FileStorage::new(temp.path().join("novels"))),
        shiori::storage::ProgressStore::new(blocker.join("progress.json")),
        options(BOOK, &temp),
    );

    let report = coordinator.run().await.unwrap();
    assert_eq!(report.total, 4);
    assert!(report.export_path.unwrap().exists());
}

#[tokio::test]
async fn test_no_entry_aborts() {
    let temp = TempDir::new().unwrap();
    let fetcher = Arc::new(FakeFetcher::new().page(
        BOOK,
        r#"<html><body><a href="/">首页</a><a href="/login">登录</a></body></html>"#,
    ));
    let mut coordinator = coordinator(fetcher, &temp, options(BOOK, &temp));

    assert!(matches!(
        coordinator.run().await,
        Err(ShioriError::Entry { .. })
    ));
}

#[tokio::test]
async fn test_chapter_files_and_export() {
    let temp = TempDir::new().unwrap();
    let mut coordinator = coordinator(Arc::new(novel_site(3)), &temp, options(BOOK, &temp));

    let report = coordinator.run().await.unwrap();

    let novel_dir = temp.path().join("novels").join("星河");
    assert_eq!(std::fs::read_dir(&novel_dir).unwrap().count(), 3);

    let export = std::fs::read_to_string(report.export_path.unwrap()).unwrap();
    let first = export.find("## 第1章 归途").unwrap();
    let third = export.find("## 第3章 归途").unwrap();
    assert!(first < third);
    assert!(export.contains("3. [第3章 归途](#chapter-3)"));
}
