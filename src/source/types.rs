use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::feed::{FilterCriteria, LoadDirection};

// ============================================================================
// Error Types
// ============================================================================

/// Failure reported by a [`DataSource`](super::DataSource) for one request.
///
/// Every variant is transient from the controller's point of view: it lands
/// in the `Error` state of the requesting direction and can be retried.
/// Clone + Eq so the cause can travel inside load-state snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Connection-level failure (DNS, TLS, reset, ...)
    #[error("Network error: {0}")]
    Network(String),
    /// Non-2xx response from a remote backend
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// The backend did not answer in time
    #[error("Request timed out")]
    Timeout,
    /// The cursor was not recognized by the backend
    #[error("Invalid page token: {0}")]
    InvalidCursor(String),
    /// The backend refused or could not serve the request
    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// Articles and Pages
// ============================================================================

/// A single article as delivered by a data source.
///
/// Title and source name use `Arc<str>` so snapshots clone cheaply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: Arc<str>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub source_name: Option<Arc<str>>,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
    #[serde(default)]
    pub content: Option<String>,
}

impl Article {
    /// Minimal article with only an id and a title.
    pub fn new(id: impl Into<String>, title: impl AsRef<str>) -> Self {
        Self {
            id: id.into(),
            title: Arc::from(title.as_ref()),
            description: None,
            url: None,
            image_url: None,
            author: None,
            source_name: None,
            published: None,
            content: None,
        }
    }
}

/// Opaque cursor naming where the next page in some direction begins.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageToken(String);

impl PageToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// One page of articles plus the cursors leading away from it.
///
/// `None` in `next` / `prev` is the end-marker for that direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<Article>,
    pub next: Option<PageToken>,
    pub prev: Option<PageToken>,
}

impl Page {
    /// Token leading further in `direction` (`prev` for Prepend, `next` otherwise).
    pub fn token_towards(&self, direction: LoadDirection) -> Option<&PageToken> {
        match direction {
            LoadDirection::Prepend => self.prev.as_ref(),
            LoadDirection::Refresh | LoadDirection::Append => self.next.as_ref(),
        }
    }
}

/// Arguments of one data source call.
///
/// `cursor` is `None` only for a Refresh. Retrying reissues an identical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub criteria: FilterCriteria,
    pub direction: LoadDirection,
    pub cursor: Option<PageToken>,
}
