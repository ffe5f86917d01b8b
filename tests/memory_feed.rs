//! End-to-end paging over the in-memory source.

mod common;

use common::settle;
use pagefeed::feed::{FeedController, FilterCriteria, LoadState};
use pagefeed::source::{DataSource, MemorySource};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn categories() -> Vec<String> {
    vec!["science".to_string(), "sports".to_string()]
}

fn english() -> Vec<String> {
    vec!["en".to_string()]
}

fn science() -> FilterCriteria {
    FilterCriteria::new("science", "en")
}

#[tokio::test(start_paused = true)]
async fn test_pages_through_demo_corpus() {
    let source: Arc<dyn DataSource> = Arc::new(
        MemorySource::demo(&categories(), &english(), 45, 10).with_latency(Duration::from_millis(300)),
    );
    let (handle, mut feed) = FeedController::spawn(source, science());

    let mut expected = 10;
    settle(&mut feed, |s| s.len() == expected && !s.state.is_loading()).await;
    loop {
        let snapshot = handle.snapshot().await.unwrap();
        if snapshot.state.append.is_exhausted() {
            break;
        }
        handle.append();
        expected = (expected + 10).min(45);
        settle(&mut feed, |s| s.len() == expected && !s.state.append.is_loading()).await;
    }

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.len(), 45);
    assert_eq!(snapshot.pages, 5);
    assert_eq!(snapshot.state.append, LoadState::EXHAUSTED);
    assert_eq!(snapshot.state.prepend, LoadState::EXHAUSTED);

    let ids: Vec<&str> = snapshot.items.iter().map(|a| a.id.as_str()).collect();
    let unique: HashSet<&str> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
    let in_order: Vec<String> = (0..45).map(|i| format!("science-en-{i}")).collect();
    assert_eq!(ids, in_order);
}

#[tokio::test(start_paused = true)]
async fn test_start_page_then_prepend_to_head() {
    let source: Arc<dyn DataSource> =
        Arc::new(MemorySource::demo(&categories(), &english(), 30, 10).with_start_page(1));
    let (handle, mut feed) = FeedController::spawn(source, science());

    let snapshot = settle(&mut feed, |s| s.len() == 10).await;
    assert_eq!(snapshot.items[0].id, "science-en-10");
    assert_eq!(snapshot.state.prepend, LoadState::IDLE);

    handle.prepend();
    let snapshot = settle(&mut feed, |s| s.len() == 20).await;
    assert_eq!(snapshot.items[0].id, "science-en-0");
    assert_eq!(snapshot.items[10].id, "science-en-10");
    assert_eq!(snapshot.state.prepend, LoadState::EXHAUSTED);

    handle.append();
    let snapshot = settle(&mut feed, |s| s.len() == 30).await;
    assert_eq!(snapshot.items[29].id, "science-en-29");
    assert_eq!(snapshot.state.append, LoadState::EXHAUSTED);
}

#[tokio::test(start_paused = true)]
async fn test_injected_failure_recovers_on_retry() {
    // Calls 1 (refresh) and 3 (retry) succeed, call 2 (append) fails.
    let source: Arc<dyn DataSource> =
        Arc::new(MemorySource::demo(&categories(), &english(), 20, 10).with_failure_every(2));
    let (handle, mut feed) = FeedController::spawn(source, science());

    settle(&mut feed, |s| s.len() == 10).await;
    handle.append();
    let snapshot = settle(&mut feed, |s| s.state.append.error().is_some()).await;
    assert_eq!(snapshot.len(), 10);

    handle.retry();
    let snapshot = settle(&mut feed, |s| s.len() == 20).await;
    assert!(!snapshot.state.has_error());
}

#[tokio::test(start_paused = true)]
async fn test_switching_filter_replaces_items() {
    let source: Arc<dyn DataSource> = Arc::new(
        MemorySource::demo(&categories(), &english(), 20, 10).with_latency(Duration::from_millis(100)),
    );
    let (handle, mut feed) = FeedController::spawn(source, science());
    settle(&mut feed, |s| s.len() == 10).await;

    handle.set_filter(FilterCriteria::new("sports", "en"));
    let snapshot = settle(&mut feed, |s| s.generation == 2 && s.len() == 10).await;
    assert!(snapshot.items.iter().all(|a| a.id.starts_with("sports-en-")));

    handle.set_filter(FilterCriteria::new("sports", "de"));
    let snapshot = settle(&mut feed, |s| s.generation == 3 && !s.state.is_loading()).await;
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.state.append, LoadState::EXHAUSTED);
}

#[tokio::test(start_paused = true)]
async fn test_language_switch_serves_translated_corpus() {
    let languages = vec!["en".to_string(), "de".to_string()];
    let source: Arc<dyn DataSource> = Arc::new(MemorySource::demo(&categories(), &languages, 15, 10));
    let (handle, mut feed) = FeedController::spawn(source, science());
    settle(&mut feed, |s| s.len() == 10).await;

    handle.set_filter(FilterCriteria::new("science", "de"));
    let snapshot = settle(&mut feed, |s| s.generation == 2 && s.len() == 10).await;
    assert!(snapshot.items.iter().all(|a| a.id.starts_with("science-de-")));
    assert_eq!(snapshot.state.append, LoadState::IDLE);
}
