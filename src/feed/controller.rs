//! Top-level feed controller.
//!
//! The controller runs as a single task that owns the [`FilterState`] and the
//! current [`FeedSession`]. Commands from [`FeedHandle`] and fetch completions
//! from the session's tasks are multiplexed with `tokio::select!`, so every
//! state transition is serialized on that one task. Snapshots are published
//! through a `watch` channel and observed with a [`FeedSubscription`].
//!
//! Each filter change bumps the generation counter. Completions carry the
//! generation of the session that spawned them and anything not matching the
//! current generation is dropped, even if it slipped past cancellation.

use futures::Stream;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

use super::filter::{FilterCriteria, FilterState};
use super::load_state::CombinedLoadState;
use super::paginator::Applied;
use super::session::{Completion, FeedSession};
use crate::source::{Article, DataSource};

/// Capacity of the completion channel between fetch tasks and the controller.
const COMPLETION_CHANNEL_SIZE: usize = 32;

/// Immutable view of the feed handed to the consumer.
///
/// `generation` changes whenever the filter does; a consumer replaces its
/// view on a new generation and updates it in place otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot {
    pub generation: u64,
    pub criteria: FilterCriteria,
    pub items: Arc<Vec<Arc<Article>>>,
    pub pages: usize,
    pub state: CombinedLoadState,
}

impl FeedSnapshot {
    fn empty(criteria: FilterCriteria) -> Self {
        Self {
            generation: 0,
            criteria,
            items: Arc::new(Vec::new()),
            pages: 0,
            state: CombinedLoadState::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

enum Command {
    SetFilter(FilterCriteria),
    Append,
    Prepend,
    Retry,
    Snapshot(oneshot::Sender<FeedSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

enum Lifecycle {
    Uninitialized,
    Active(FeedSession),
    Shutdown,
}

pub struct FeedController {
    source: Arc<dyn DataSource>,
    filter: FilterState,
    generation: u64,
    lifecycle: Lifecycle,
    completion_tx: mpsc::Sender<Completion>,
    snapshots: watch::Sender<FeedSnapshot>,
}

impl FeedController {
    /// Spawn the controller task for `initial` and return its handle and
    /// subscription. Must be called from within a tokio runtime.
    ///
    /// The first session (generation 1) starts immediately. The task exits
    /// on [`FeedHandle::shutdown`] or when every handle has been dropped.
    pub fn spawn(source: Arc<dyn DataSource>, initial: FilterCriteria) -> (FeedHandle, FeedSubscription) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::channel(COMPLETION_CHANNEL_SIZE);
        let (controller, subscription) = Self::new(source, initial, completion_tx);
        let handle = FeedHandle {
            commands: command_tx,
            filter: controller.filter.subscribe(),
        };

        tokio::spawn(controller.run(command_rx, completion_rx));
        (handle, subscription)
    }

    fn new(
        source: Arc<dyn DataSource>,
        initial: FilterCriteria,
        completion_tx: mpsc::Sender<Completion>,
    ) -> (Self, FeedSubscription) {
        let (snapshots, rx) = watch::channel(FeedSnapshot::empty(initial.clone()));
        let controller = Self {
            source,
            filter: FilterState::new(initial),
            generation: 0,
            lifecycle: Lifecycle::Uninitialized,
            completion_tx,
            snapshots,
        };
        (controller, FeedSubscription { rx })
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut completions: mpsc::Receiver<Completion>,
    ) {
        if self.start() {
            self.publish();
        }

        let mut ack = None;
        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(command) => match self.handle_command(command) {
                        ControlFlow::Continue(true) => self.publish(),
                        ControlFlow::Continue(false) => {}
                        ControlFlow::Break(reply) => {
                            ack = Some(reply);
                            break;
                        }
                    },
                    None => {
                        tracing::debug!("All feed handles dropped");
                        break;
                    }
                },

                Some(completion) = completions.recv() => {
                    if self.handle_completion(completion) {
                        self.publish();
                    }
                }
            }
        }

        // Close every surface before acknowledging, so a caller awaiting
        // shutdown observes a stopped controller.
        self.shutdown();
        commands.close();
        drop(self);
        if let Some(ack) = ack {
            let _ = ack.send(());
        }
    }

    /// Apply one command. `Continue` carries whether a snapshot should be
    /// published; `Break` carries the shutdown acknowledgement.
    fn handle_command(&mut self, command: Command) -> ControlFlow<oneshot::Sender<()>, bool> {
        let changed = match command {
            Command::SetFilter(criteria) => self.set_filter(criteria),
            Command::Append => self.with_session("append", FeedSession::append),
            Command::Prepend => self.with_session("prepend", FeedSession::prepend),
            Command::Retry => self.with_session("retry", FeedSession::retry),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
                false
            }
            Command::Shutdown(ack) => return ControlFlow::Break(ack),
        };
        ControlFlow::Continue(changed)
    }

    /// Start the first session. No-op unless uninitialized.
    fn start(&mut self) -> bool {
        if !matches!(self.lifecycle, Lifecycle::Uninitialized) {
            return false;
        }
        self.restart();
        true
    }

    fn set_filter(&mut self, criteria: FilterCriteria) -> bool {
        if matches!(self.lifecycle, Lifecycle::Shutdown) {
            return false;
        }
        if !self.filter.set(criteria) {
            tracing::debug!(criteria = %self.filter.get(), "Filter unchanged, keeping session");
            return false;
        }
        self.restart();
        true
    }

    fn restart(&mut self) {
        if let Lifecycle::Active(session) = &mut self.lifecycle {
            session.cancel();
        }

        self.generation += 1;
        let criteria = self.filter.get();
        tracing::info!(generation = self.generation, %criteria, "Starting feed session");

        let mut session = FeedSession::new(
            self.generation,
            criteria,
            Arc::clone(&self.source),
            self.completion_tx.clone(),
        );
        session.start();
        self.lifecycle = Lifecycle::Active(session);
    }

    fn with_session(&mut self, command: &'static str, op: fn(&mut FeedSession) -> bool) -> bool {
        match &mut self.lifecycle {
            Lifecycle::Active(session) => {
                let changed = op(session);
                if !changed {
                    tracing::debug!(command, generation = session.generation(), "Command was a no-op");
                }
                changed
            }
            Lifecycle::Uninitialized | Lifecycle::Shutdown => {
                tracing::debug!(command, "No active session, ignoring command");
                false
            }
        }
    }

    fn handle_completion(&mut self, completion: Completion) -> bool {
        if completion.generation != self.generation {
            tracing::debug!(
                expected = self.generation,
                got = completion.generation,
                direction = %completion.request.direction,
                "Ignoring stale page (generation mismatch)"
            );
            return false;
        }
        match &mut self.lifecycle {
            Lifecycle::Active(session) => !matches!(session.apply(completion), Applied::Ignored),
            Lifecycle::Uninitialized | Lifecycle::Shutdown => false,
        }
    }

    fn shutdown(&mut self) {
        if let Lifecycle::Active(session) = &mut self.lifecycle {
            session.cancel();
        }
        if !matches!(self.lifecycle, Lifecycle::Shutdown) {
            tracing::info!(generation = self.generation, "Feed controller shut down");
        }
        self.lifecycle = Lifecycle::Shutdown;
    }

    fn snapshot(&self) -> FeedSnapshot {
        match &self.lifecycle {
            Lifecycle::Active(session) => FeedSnapshot {
                generation: session.generation(),
                criteria: session.criteria().clone(),
                items: session.items(),
                pages: session.page_count(),
                state: session.state().clone(),
            },
            Lifecycle::Uninitialized | Lifecycle::Shutdown => self.snapshots.borrow().clone(),
        }
    }

    fn publish(&self) {
        if matches!(self.lifecycle, Lifecycle::Shutdown) {
            return;
        }
        self.snapshots.send_replace(self.snapshot());
    }
}

// ============================================================================
// Consumer Surface
// ============================================================================

/// Command side of a running controller.
///
/// Cheap to clone. Every command is queued to the controller task and
/// applied in order; after shutdown all commands are silently ignored.
#[derive(Clone)]
pub struct FeedHandle {
    commands: mpsc::UnboundedSender<Command>,
    filter: watch::Receiver<FilterCriteria>,
}

impl FeedHandle {
    /// Switch to a new filter. Identical criteria keep the current session.
    pub fn set_filter(&self, criteria: FilterCriteria) {
        self.send(Command::SetFilter(criteria));
    }

    /// Load the next page, unless one is already loading or data is exhausted.
    pub fn append(&self) {
        self.send(Command::Append);
    }

    /// Load the previous page, unless one is already loading or data is exhausted.
    pub fn prepend(&self) {
        self.send(Command::Prepend);
    }

    /// Reissue the most recently failed request, if any.
    pub fn retry(&self) {
        self.send(Command::Retry);
    }

    /// Current snapshot, read through the command queue so it reflects every
    /// command sent before it. `None` once the controller has stopped.
    pub async fn snapshot(&self) -> Option<FeedSnapshot> {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Snapshot(tx)).is_err() {
            return None;
        }
        rx.await.ok()
    }

    /// Cancel the current session and stop the controller.
    ///
    /// Resolves once the controller has processed the shutdown (or
    /// immediately if it already stopped).
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Receiver marked changed on every distinct filter transition.
    pub fn watch_filter(&self) -> watch::Receiver<FilterCriteria> {
        self.filter.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Feed controller stopped, ignoring command");
        }
    }
}

/// Snapshot side of a running controller.
///
/// Latest-value semantics: a slow consumer sees the most recent snapshot,
/// never a stale one. Ends once the controller has shut down.
#[derive(Clone)]
pub struct FeedSubscription {
    rx: watch::Receiver<FeedSnapshot>,
}

impl FeedSubscription {
    pub fn current(&self) -> FeedSnapshot {
        self.rx.borrow().clone()
    }

    /// Whether a snapshot was published since the last one observed.
    pub fn has_update(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait for the next snapshot. `None` once the controller has stopped.
    pub async fn next(&mut self) -> Option<FeedSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until a snapshot satisfies `predicate` (the current one included).
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&FeedSnapshot) -> bool,
    ) -> Option<FeedSnapshot> {
        let snapshot = self.rx.wait_for(|s| predicate(s)).await.ok()?;
        Some(snapshot.clone())
    }

    pub fn into_stream(self) -> impl Stream<Item = FeedSnapshot> {
        futures::stream::unfold(self, |mut subscription| async move {
            let snapshot = subscription.next().await?;
            Some((snapshot, subscription))
        })
    }
}
