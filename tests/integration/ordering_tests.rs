//! Ordering properties over the public API

use shiori::chapter::title_ordinal;
use shiori::{order, ChapterCandidate};

fn candidate(title: &str, location: &str) -> ChapterCandidate {
    ChapterCandidate::new(title, location)
}

fn locations(chapters: &[ChapterCandidate]) -> Vec<&str> {
    chapters.iter().map(|c| c.location.as_str()).collect()
}

fn sample() -> Vec<ChapterCandidate> {
    vec![
        candidate("第三章 夜行", "https://novel.test/book/1003.html"),
        candidate("序章", "https://novel.test/book/1000.html"),
        candidate("第一章 开端", "https://novel.test/book/1001.html"),
        candidate("第十二章 归途", "https://novel.test/book/1012.html"),
        candidate("第二章 风起", "https://novel.test/book/1002.html"),
        candidate("番外", "https://novel.test/book/extra.html"),
    ]
}

#[test]
fn test_order_is_permutation_invariant() {
    let expected = order(&sample());

    let mut reversed = sample();
    reversed.reverse();
    assert_eq!(order(&reversed), expected);

    for shift in 1..sample().len() {
        let mut rotated = sample();
        rotated.rotate_left(shift);
        assert_eq!(order(&rotated), expected, "rotation by {}", shift);
    }

    assert_eq!(
        locations(&expected),
        vec![
            "https://novel.test/book/1000.html",
            "https://novel.test/book/1001.html",
            "https://novel.test/book/1002.html",
            "https://novel.test/book/1003.html",
            "https://novel.test/book/1012.html",
            "https://novel.test/book/extra.html",
        ]
    );
}

#[test]
fn test_order_is_idempotent() {
    let once = order(&sample());
    assert_eq!(order(&once), once);
}

#[test]
fn test_duplicate_locations_collapse() {
    let mut chapters = sample();
    chapters.push(candidate("第一章 开端（重复）", "https://novel.test/book/1001.html"));

    let ordered = order(&chapters);
    assert_eq!(ordered.len(), sample().len());
    assert_eq!(
        ordered
            .iter()
            .filter(|c| c.location == "https://novel.test/book/1001.html")
            .count(),
        1
    );
}

#[test]
fn test_location_ordinal_dominates_title() {
    let ordered = order(&[
        candidate("Intro", "https://novel.test/book/5.html"),
        candidate("第一章", "https://novel.test/book/3.html"),
    ]);

    assert_eq!(
        locations(&ordered),
        vec!["https://novel.test/book/3.html", "https://novel.test/book/5.html"]
    );
}

#[test]
fn test_unparsed_numeral_without_locations() {
    assert_eq!(title_ordinal("第一百零五章 远行"), Some(999));

    let ordered = order(&[
        candidate("Notes", "https://novel.test/book/notes.html"),
        candidate("第一百零五章 远行", "https://novel.test/book/far.html"),
        candidate("第998章 前夜", "https://novel.test/book/eve.html"),
    ]);

    let titles: Vec<&str> = ordered.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["第998章 前夜", "第一百零五章 远行", "Notes"]);
}

#[test]
fn test_unparsed_numeral_with_location_ordinal() {
    let ordered = order(&[
        candidate("第一百零五章 远行", "https://novel.test/book/far.html"),
        candidate("Notes", "https://novel.test/book/7.html"),
    ]);

    let titles: Vec<&str> = ordered.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Notes", "第一百零五章 远行"]);
}
