use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::filter::FilterCriteria;
use super::load_state::{CombinedLoadState, LoadDirection};
use super::paginator::{Applied, Paginator};
use crate::source::{Article, DataSource, Page, PageRequest, SourceError};

/// Outcome of one fetch, tagged with the generation of the session that ran it.
#[derive(Debug)]
pub struct Completion {
    pub generation: u64,
    pub request: PageRequest,
    pub result: Result<Page, SourceError>,
}

/// One filter value bound to one paginator, for one generation.
///
/// Fetches run as spawned tasks that report back through the controller's
/// completion channel. The session owns their cancellation scope; dropping
/// the session cancels it.
pub struct FeedSession {
    generation: u64,
    paginator: Paginator,
    items: Arc<Vec<Arc<Article>>>,
    source: Arc<dyn DataSource>,
    completions: mpsc::Sender<Completion>,
    token: CancellationToken,
    /// In-flight fetch per direction, indexed by `LoadDirection::index`.
    tasks: [Option<JoinHandle<()>>; 3],
}

impl FeedSession {
    pub fn new(
        generation: u64,
        criteria: FilterCriteria,
        source: Arc<dyn DataSource>,
        completions: mpsc::Sender<Completion>,
    ) -> Self {
        Self {
            generation,
            paginator: Paginator::new(criteria),
            items: Arc::new(Vec::new()),
            source,
            completions,
            token: CancellationToken::new(),
            tasks: [None, None, None],
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn criteria(&self) -> &FilterCriteria {
        self.paginator.criteria()
    }

    pub fn state(&self) -> &CombinedLoadState {
        self.paginator.state()
    }

    pub fn items(&self) -> Arc<Vec<Arc<Article>>> {
        Arc::clone(&self.items)
    }

    pub fn page_count(&self) -> usize {
        self.paginator.page_count()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Kick off the initial load. Returns whether anything changed.
    pub fn start(&mut self) -> bool {
        if self.is_cancelled() {
            return false;
        }
        let request = self.paginator.load_initial();
        self.run(request)
    }

    pub fn append(&mut self) -> bool {
        self.load(LoadDirection::Append)
    }

    pub fn prepend(&mut self) -> bool {
        self.load(LoadDirection::Prepend)
    }

    pub fn retry(&mut self) -> bool {
        if self.is_cancelled() {
            return false;
        }
        let request = self.paginator.retry_last();
        self.run(request)
    }

    /// Cancel the session and abort its in-flight fetches.
    pub fn cancel(&mut self) {
        if self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        for task in self.tasks.iter_mut().filter_map(Option::take) {
            task.abort();
        }
        tracing::debug!(
            generation = self.generation,
            criteria = %self.paginator.criteria(),
            "Cancelled feed session"
        );
    }

    /// Feed a completion from this session's generation into the paginator.
    pub fn apply(&mut self, completion: Completion) -> Applied {
        let Completion {
            generation,
            request,
            result,
        } = completion;
        debug_assert_eq!(generation, self.generation);

        let direction = request.direction;
        self.tasks[direction.index()] = None;
        if self.is_cancelled() {
            return Applied::Ignored;
        }

        let applied = self.paginator.complete(request, result);
        match &applied {
            Applied::Page { items, end_of_data } => {
                self.items = self.paginator.items();
                tracing::debug!(
                    generation,
                    %direction,
                    items,
                    end_of_data,
                    total = self.items.len(),
                    "Page loaded"
                );
            }
            Applied::Failed => {
                if let Some(cause) = self.paginator.state().get(direction).error() {
                    tracing::warn!(generation, %direction, error = %cause, "Page fetch failed");
                }
            }
            Applied::Ignored => {
                tracing::debug!(generation, %direction, "Ignoring unexpected page completion");
            }
        }
        applied
    }

    fn load(&mut self, direction: LoadDirection) -> bool {
        if self.is_cancelled() || self.paginator.state().get(direction).is_loading() {
            return false;
        }
        let before = self.paginator.state().get(direction).clone();
        let request = match direction {
            LoadDirection::Append => self.paginator.load_append(),
            LoadDirection::Prepend => self.paginator.load_prepend(),
            LoadDirection::Refresh => self.paginator.load_initial(),
        };
        // Hitting the end-marker for the first time changes state without a fetch.
        let exhausted_now = request.is_none() && *self.paginator.state().get(direction) != before;
        self.run(request) || exhausted_now
    }

    fn run(&mut self, request: Option<PageRequest>) -> bool {
        let Some(request) = request else {
            return false;
        };

        let slot = request.direction.index();
        if let Some(previous) = self.tasks[slot].take() {
            previous.abort();
        }

        let source = Arc::clone(&self.source);
        let completions = self.completions.clone();
        let token = self.token.clone();
        let generation = self.generation;

        tracing::debug!(
            generation,
            direction = %request.direction,
            cursor = ?request.cursor,
            "Spawning page fetch"
        );

        self.tasks[slot] = Some(tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!(generation, direction = %request.direction, "Fetch abandoned");
                    return;
                }
                result = source.fetch(&request) => result,
            };

            // The session may have been cancelled while the fetch resolved.
            if token.is_cancelled() {
                tracing::debug!(generation, direction = %request.direction, "Discarding late page");
                return;
            }

            let completion = Completion {
                generation,
                request,
                result,
            };
            if let Err(e) = completions.send(completion).await {
                tracing::debug!(error = %e, "Failed to deliver page (controller gone)");
            }
        }));
        true
    }
}

impl Drop for FeedSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::LoadState;
    use crate::source::MemorySource;

    fn source() -> Arc<dyn DataSource> {
        let mut source = MemorySource::new(2);
        source.insert(
            FilterCriteria::new("technology", "en"),
            (0..5).map(|i| Article::new(format!("a{i}"), "t")).collect(),
        );
        Arc::new(source)
    }

    fn session(tx: mpsc::Sender<Completion>) -> FeedSession {
        FeedSession::new(7, FilterCriteria::new("technology", "en"), source(), tx)
    }

    #[tokio::test]
    async fn test_start_spawns_tagged_fetch() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut session = session(tx);
        assert!(session.start());
        assert!(session.state().refresh.is_loading());

        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.generation, 7);
        assert_eq!(completion.request.direction, LoadDirection::Refresh);

        let applied = session.apply(completion);
        assert!(matches!(applied, Applied::Page { items: 2, .. }));
        assert_eq!(session.items().len(), 2);
    }

    #[tokio::test]
    async fn test_append_gated_while_loading() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut session = session(tx);
        session.start();
        let completion = rx.recv().await.unwrap();
        session.apply(completion);

        assert!(session.append());
        assert!(!session.append(), "second append while loading is a no-op");
        let completion = rx.recv().await.unwrap();
        session.apply(completion);
        assert_eq!(session.items().len(), 4);
        assert_eq!(session.page_count(), 2);
    }

    #[tokio::test]
    async fn test_exhaustion_reported_once_without_fetch() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut session = session(tx);
        session.start();
        session.apply(rx.recv().await.unwrap());
        for _ in 0..2 {
            session.append();
            session.apply(rx.recv().await.unwrap());
        }
        assert_eq!(session.state().append, LoadState::EXHAUSTED);
        assert!(!session.append());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancelled_session_is_inert() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut session = session(tx);
        session.cancel();
        assert!(session.is_cancelled());
        assert!(!session.start());
        assert!(!session.append());
        assert!(!session.retry());
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }
}
