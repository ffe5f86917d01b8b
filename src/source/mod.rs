//! Data sources feeding the paginator.
//!
//! A [`DataSource`] answers one [`PageRequest`] at a time with a [`Page`] or a
//! [`SourceError`]. It holds no paging state of its own; cursors are owned by
//! the paginator and passed back verbatim.
//!
//! - [`types`] - articles, pages, tokens, requests and the error type
//! - [`memory`] - in-memory corpus source, loadable from a JSON fixture

mod memory;
mod types;

pub use memory::{FixtureError, MemorySource};
pub use types::{Article, Page, PageRequest, PageToken, SourceError};

/// Backend that serves pages of articles for a filter.
///
/// Implementations must be safe to call repeatedly with the same request:
/// retries reissue the exact request that failed. Timeout policy lives here,
/// not in the controller.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, request: &PageRequest) -> Result<Page, SourceError>;
}
