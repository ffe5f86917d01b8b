//! Multi-directional paging over a data source, for one filter.
//!
//! The paginator never awaits. Each load operation either returns the
//! [`PageRequest`] the caller must run, or `None` when there is nothing to
//! do; the outcome is handed back through [`Paginator::complete`]. This keeps
//! cursor bookkeeping synchronous and lets several directions be in flight
//! at once without sharing `&mut` across await points.

use std::sync::Arc;

use super::filter::FilterCriteria;
use super::load_state::{reduce, CombinedLoadState, LoadDirection, LoadEvent, LoadState};
use crate::source::{Article, Page, PageRequest, PageToken, SourceError};

/// Position of a paging cursor in one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    /// The initial load has not seeded this direction yet.
    Unseeded,
    At(PageToken),
    End,
}

impl Cursor {
    fn from_token(token: Option<&PageToken>) -> Self {
        token.cloned().map_or(Cursor::End, Cursor::At)
    }
}

/// What a [`Paginator::complete`] call did with a fetch outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// A page was added; `end_of_data` is the new state of its direction.
    Page { items: usize, end_of_data: bool },
    /// The direction moved to `Error`; pages were kept.
    Failed,
    /// The direction was not waiting for this result.
    Ignored,
}

pub struct Paginator {
    criteria: FilterCriteria,
    forward: Cursor,
    backward: Cursor,
    state: CombinedLoadState,
    /// Accumulated articles in cursor order, shared with published snapshots.
    items: Vec<Arc<Article>>,
    pages: usize,
    /// Failed requests, most recent last, at most one per direction.
    failed: Vec<PageRequest>,
}

impl Paginator {
    pub fn new(criteria: FilterCriteria) -> Self {
        Self {
            criteria,
            forward: Cursor::Unseeded,
            backward: Cursor::Unseeded,
            state: CombinedLoadState::default(),
            items: Vec::new(),
            pages: 0,
            failed: Vec::new(),
        }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn state(&self) -> &CombinedLoadState {
        &self.state
    }

    pub fn page_count(&self) -> usize {
        self.pages
    }

    /// All accumulated articles in cursor order. Articles are shared, not
    /// copied, between successive calls.
    pub fn items(&self) -> Arc<Vec<Arc<Article>>> {
        Arc::new(self.items.clone())
    }

    /// Request for the first page. `None` while a refresh is already running.
    pub fn load_initial(&mut self) -> Option<PageRequest> {
        if self.state.refresh.is_loading() {
            return None;
        }
        Some(self.issue(LoadDirection::Refresh, None))
    }

    /// Request for the page after the last one, if there is one.
    pub fn load_append(&mut self) -> Option<PageRequest> {
        self.load_towards(LoadDirection::Append)
    }

    /// Request for the page before the first one, if there is one.
    pub fn load_prepend(&mut self) -> Option<PageRequest> {
        self.load_towards(LoadDirection::Prepend)
    }

    /// Reissue the most recently failed request with its original cursor.
    ///
    /// Returns `None` when no failure is pending. Older failures stay queued
    /// and are reissued by subsequent calls.
    pub fn retry_last(&mut self) -> Option<PageRequest> {
        while let Some(request) = self.failed.pop() {
            // A failure is only retryable while its direction still shows it.
            if self.state.get(request.direction).error().is_none() {
                continue;
            }
            self.emit(request.direction, LoadState::Loading);
            return Some(request);
        }
        None
    }

    /// Apply the outcome of a request previously returned by this paginator.
    pub fn complete(&mut self, request: PageRequest, result: Result<Page, SourceError>) -> Applied {
        let direction = request.direction;
        if !self.state.get(direction).is_loading() || request.criteria != self.criteria {
            return Applied::Ignored;
        }

        match result {
            Ok(page) => {
                let end_of_data = page.token_towards(direction).is_none();
                let items = page.items.len();
                self.accept(direction, page);
                self.failed.retain(|r| r.direction != direction);
                self.emit(direction, LoadState::NotLoading { end_of_data });
                Applied::Page { items, end_of_data }
            }
            Err(cause) => {
                self.failed.retain(|r| r.direction != direction);
                self.failed.push(request);
                self.emit(direction, LoadState::Error(cause));
                Applied::Failed
            }
        }
    }

    fn load_towards(&mut self, direction: LoadDirection) -> Option<PageRequest> {
        if self.state.get(direction).is_loading() {
            return None;
        }
        let cursor = match direction {
            LoadDirection::Append => self.forward.clone(),
            LoadDirection::Prepend => self.backward.clone(),
            LoadDirection::Refresh => return self.load_initial(),
        };
        match cursor {
            Cursor::Unseeded => None,
            Cursor::End => {
                if !self.state.get(direction).is_exhausted() {
                    self.emit(direction, LoadState::EXHAUSTED);
                }
                None
            }
            Cursor::At(token) => Some(self.issue(direction, Some(token))),
        }
    }

    fn issue(&mut self, direction: LoadDirection, cursor: Option<PageToken>) -> PageRequest {
        self.emit(direction, LoadState::Loading);
        PageRequest {
            criteria: self.criteria.clone(),
            direction,
            cursor,
        }
    }

    fn accept(&mut self, direction: LoadDirection, page: Page) {
        match direction {
            LoadDirection::Refresh => {
                self.forward = Cursor::from_token(page.next.as_ref());
                self.backward = Cursor::from_token(page.prev.as_ref());
                self.items = page.items.into_iter().map(Arc::new).collect();
                self.pages = 1;
                // A refresh resets the other directions along with their cursors.
                self.failed.clear();
                let append = LoadState::NotLoading {
                    end_of_data: self.forward == Cursor::End,
                };
                let prepend = LoadState::NotLoading {
                    end_of_data: self.backward == Cursor::End,
                };
                self.emit(LoadDirection::Append, append);
                self.emit(LoadDirection::Prepend, prepend);
            }
            LoadDirection::Append => {
                self.forward = Cursor::from_token(page.next.as_ref());
                self.items.extend(page.items.into_iter().map(Arc::new));
                self.pages += 1;
            }
            LoadDirection::Prepend => {
                self.backward = Cursor::from_token(page.prev.as_ref());
                self.items.splice(0..0, page.items.into_iter().map(Arc::new));
                self.pages += 1;
            }
        }
    }

    fn emit(&mut self, direction: LoadDirection, state: LoadState) {
        self.state = reduce(&self.state, &LoadEvent::new(direction, state));
    }
}
