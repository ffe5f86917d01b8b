//! Reactive paginated feed.
//!
//! Layers, leaves first:
//!
//! - [`filter`] - the active category/language pair and its change notification
//! - [`load_state`] - per-direction load states and the pure reducer over them
//! - [`paginator`] - sans-IO multi-directional paging for one filter
//! - [`session`] - binds a filter and generation to a paginator and runs its fetches
//! - [`controller`] - owns the filter and the live session, restarts on filter change
//!
//! # Example
//!
//! ```ignore
//! let (handle, mut feed) = FeedController::spawn(source, FilterCriteria::new("technology", "en"));
//! while let Some(snapshot) = feed.next().await {
//!     render(&snapshot.items, &snapshot.state);
//! }
//! ```

mod controller;
mod filter;
mod load_state;
mod paginator;
mod session;

pub use controller::{FeedController, FeedHandle, FeedSnapshot, FeedSubscription};
pub use filter::{FilterCriteria, FilterState};
pub use load_state::{reduce, CombinedLoadState, LoadDirection, LoadEvent, LoadState};
pub use paginator::{Applied, Paginator};
pub use session::{Completion, FeedSession};
