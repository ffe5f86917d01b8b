//! Shared fixtures for feed integration tests.
//!
//! [`ScriptedSource`] hands every fetch to the test as a [`PendingFetch`] and
//! blocks until the test answers it, so fetch timing is fully controlled.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use pagefeed::feed::{FeedSnapshot, FeedSubscription, FilterCriteria};
use pagefeed::source::{Article, DataSource, Page, PageRequest, PageToken, SourceError};

pub struct PendingFetch {
    pub request: PageRequest,
    reply: oneshot::Sender<Result<Page, SourceError>>,
}

impl PendingFetch {
    /// Answer the fetch. Returns false if the fetch was abandoned meanwhile.
    pub fn reply(self, result: Result<Page, SourceError>) -> bool {
        self.reply.send(result).is_ok()
    }
}

pub struct ScriptedSource {
    calls: mpsc::UnboundedSender<PendingFetch>,
}

impl ScriptedSource {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PendingFetch>) {
        let (calls, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { calls }), rx)
    }
}

#[async_trait::async_trait]
impl DataSource for ScriptedSource {
    async fn fetch(&self, request: &PageRequest) -> Result<Page, SourceError> {
        let (reply, rx) = oneshot::channel();
        self.calls
            .send(PendingFetch {
                request: request.clone(),
                reply,
            })
            .map_err(|_| SourceError::Unavailable("test finished".into()))?;
        rx.await
            .unwrap_or_else(|_| Err(SourceError::Unavailable("reply dropped".into())))
    }
}

pub fn tech() -> FilterCriteria {
    FilterCriteria::new("technology", "en")
}

pub fn world() -> FilterCriteria {
    FilterCriteria::new("world", "en")
}

pub fn page(prefix: &str, count: usize, next: Option<&str>, prev: Option<&str>) -> Page {
    Page {
        items: (0..count)
            .map(|i| Article::new(format!("{prefix}-{i}"), format!("{prefix} article {i}")))
            .collect(),
        next: next.map(PageToken::from),
        prev: prev.map(PageToken::from),
    }
}

/// Next fetch issued to the scripted source.
pub async fn next_call(calls: &mut mpsc::UnboundedReceiver<PendingFetch>) -> PendingFetch {
    tokio::time::timeout(Duration::from_secs(5), calls.recv())
        .await
        .expect("expected a fetch to be issued")
        .expect("scripted source dropped")
}

/// Assert that no fetch is issued while the runtime goes idle.
///
/// A closed channel counts as quiet: the controller drops the source once it
/// has stopped.
pub async fn no_call(calls: &mut mpsc::UnboundedReceiver<PendingFetch>) {
    if let Ok(Some(call)) = tokio::time::timeout(Duration::from_millis(100), calls.recv()).await {
        panic!("unexpected fetch: {:?}", call.request);
    }
}

/// Wait until the feed publishes a snapshot matching `predicate`.
pub async fn settle(
    feed: &mut FeedSubscription,
    predicate: impl FnMut(&FeedSnapshot) -> bool,
) -> FeedSnapshot {
    tokio::time::timeout(Duration::from_secs(5), feed.wait_for(predicate))
        .await
        .expect("feed did not reach the expected state")
        .expect("feed closed")
}
