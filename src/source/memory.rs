//! In-memory data source.
//!
//! Serves a fixed corpus per [`FilterCriteria`], cut into pages of
//! `page_size` articles. Tokens are `p<index>` where `<index>` is the
//! zero-based page number, so a cursor can be replayed any number of times.

use chrono::{DateTime, Duration as ChronoDuration};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::{Article, DataSource, Page, PageRequest, PageToken, SourceError};
use crate::feed::{FilterCriteria, LoadDirection};

/// Maximum fixture file size (16 MB).
const MAX_FIXTURE_SIZE: u64 = 16 * 1024 * 1024;

/// Base timestamp for generated demo articles (2023-11-14T22:13:20Z).
const DEMO_EPOCH_SECS: i64 = 1_700_000_000;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON in fixture file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Fixture file too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: u64, max: u64 },
}

/// On-disk fixture layout: a list of article feeds, one per filter.
#[derive(Debug, Deserialize)]
struct Fixture {
    feeds: Vec<FixtureFeed>,
}

#[derive(Debug, Deserialize)]
struct FixtureFeed {
    category: String,
    language: String,
    #[serde(default)]
    articles: Vec<Article>,
}

/// Paginated in-memory corpus keyed by filter.
///
/// Filters without a corpus yield a single empty page with both cursors at
/// the end-marker.
pub struct MemorySource {
    corpus: HashMap<FilterCriteria, Arc<Vec<Article>>>,
    page_size: usize,
    start_page: usize,
    latency: Duration,
    fail_every: u64,
    calls: AtomicU64,
}

impl MemorySource {
    pub fn new(page_size: usize) -> Self {
        Self {
            corpus: HashMap::new(),
            page_size: page_size.max(1),
            start_page: 0,
            latency: Duration::ZERO,
            fail_every: 0,
            calls: AtomicU64::new(0),
        }
    }

    /// Register the articles served for `criteria`, replacing any previous set.
    pub fn insert(&mut self, criteria: FilterCriteria, articles: Vec<Article>) {
        self.corpus.insert(criteria, Arc::new(articles));
    }

    /// Page the initial (Refresh) load lands on, clamped to the last page.
    pub fn with_start_page(mut self, start_page: usize) -> Self {
        self.start_page = start_page;
        self
    }

    /// Delay applied to every fetch before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail every `n`th call with [`SourceError::Unavailable`]. 0 disables.
    pub fn with_failure_every(mut self, n: u64) -> Self {
        self.fail_every = n;
        self
    }

    /// Number of fetches served so far, failed ones included.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Load a corpus from a JSON fixture file.
    ///
    /// ```json
    /// { "feeds": [ { "category": "technology", "language": "en",
    ///                "articles": [ { "id": "a1", "title": "..." } ] } ] }
    /// ```
    pub fn from_fixture(path: &Path, page_size: usize) -> Result<Self, FixtureError> {
        let size = std::fs::metadata(path)?.len();
        if size > MAX_FIXTURE_SIZE {
            return Err(FixtureError::TooLarge {
                size,
                max: MAX_FIXTURE_SIZE,
            });
        }

        let content = std::fs::read_to_string(path)?;
        let source = Self::from_json(&content, page_size)?;
        tracing::info!(
            path = %path.display(),
            feeds = source.corpus.len(),
            "Loaded fixture"
        );
        Ok(source)
    }

    /// Parse a fixture document already in memory.
    pub fn from_json(json: &str, page_size: usize) -> Result<Self, FixtureError> {
        let fixture: Fixture = serde_json::from_str(json)?;
        let mut source = Self::new(page_size);
        for feed in fixture.feeds {
            let criteria = FilterCriteria::new(feed.category, feed.language);
            if source.corpus.contains_key(&criteria) {
                tracing::warn!(%criteria, "Duplicate feed in fixture, later entry wins");
            }
            source.insert(criteria, feed.articles);
        }
        Ok(source)
    }

    /// Generated corpus: `per_category` articles for every category in
    /// every language.
    pub fn demo(
        categories: &[String],
        languages: &[String],
        per_category: usize,
        page_size: usize,
    ) -> Self {
        let mut source = Self::new(page_size);
        for language in languages {
            for category in categories {
                let articles = (0..per_category)
                    .map(|i| demo_article(category, language, i))
                    .collect();
                source.insert(FilterCriteria::new(category.as_str(), language.as_str()), articles);
            }
        }
        source
    }

    fn page_count(&self, len: usize) -> usize {
        len.div_ceil(self.page_size).max(1)
    }

    fn parse_cursor(&self, token: &PageToken, len: usize) -> Result<usize, SourceError> {
        let index = token
            .as_str()
            .strip_prefix('p')
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(|| SourceError::InvalidCursor(token.to_string()))?;
        if index >= self.page_count(len) {
            return Err(SourceError::InvalidCursor(token.to_string()));
        }
        Ok(index)
    }

    fn page_at(&self, articles: &[Article], index: usize) -> Page {
        let start = (index * self.page_size).min(articles.len());
        let end = (start + self.page_size).min(articles.len());
        let last = self.page_count(articles.len()) - 1;
        Page {
            items: articles[start..end].to_vec(),
            next: (index < last).then(|| PageToken::new(format!("p{}", index + 1))),
            prev: (index > 0).then(|| PageToken::new(format!("p{}", index - 1))),
        }
    }
}

#[async_trait::async_trait]
impl DataSource for MemorySource {
    async fn fetch(&self, request: &PageRequest) -> Result<Page, SourceError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if self.fail_every > 0 && call % self.fail_every == 0 {
            tracing::debug!(call, direction = %request.direction, "Injected failure");
            return Err(SourceError::Unavailable(format!("injected failure on call {call}")));
        }

        let articles = self
            .corpus
            .get(&request.criteria)
            .map(|a| a.as_slice())
            .unwrap_or(&[]);

        let index = match (&request.direction, &request.cursor) {
            (LoadDirection::Refresh, None) => self.start_page.min(self.page_count(articles.len()) - 1),
            (_, Some(token)) => self.parse_cursor(token, articles.len())?,
            (direction, None) => {
                return Err(SourceError::InvalidCursor(format!(
                    "missing cursor for {direction} request"
                )))
            }
        };

        Ok(self.page_at(articles, index))
    }
}

fn demo_article(category: &str, language: &str, index: usize) -> Article {
    let mut article = Article::new(
        format!("{category}-{language}-{index}"),
        format!("{} story #{} ({language})", capitalize(category), index + 1),
    );
    article.source_name = Some(Arc::from("Demo Wire"));
    article.published = DateTime::from_timestamp(DEMO_EPOCH_SECS, 0)
        .map(|t| t - ChronoDuration::minutes(index as i64 * 15));
    article
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Tests
// ============================================================================
