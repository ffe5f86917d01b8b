use std::fmt;
use tokio::sync::watch;

/// The category/language pair driving what the feed fetches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterCriteria {
    pub category: String,
    pub language: String,
}

impl FilterCriteria {
    pub fn new(category: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            language: language.into(),
        }
    }
}

impl fmt::Display for FilterCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.language)
    }
}

/// Current filter plus its change notification.
///
/// Subscribers are woken exactly once per distinct transition. Setting the
/// value that is already current does not notify, which keeps the controller
/// from restarting an identical session.
pub struct FilterState {
    tx: watch::Sender<FilterCriteria>,
}

impl FilterState {
    pub fn new(initial: FilterCriteria) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn get(&self) -> FilterCriteria {
        self.tx.borrow().clone()
    }

    /// Replace the current filter. Returns whether the value changed.
    pub fn set(&self, criteria: FilterCriteria) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == criteria {
                return false;
            }
            *current = criteria;
            true
        })
    }

    /// Receiver that is marked changed on every distinct transition.
    pub fn subscribe(&self) -> watch::Receiver<FilterCriteria> {
        self.tx.subscribe()
    }
}
