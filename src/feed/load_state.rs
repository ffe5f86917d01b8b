//! Per-direction load states and the reducer that combines them.

use std::fmt;

use crate::source::SourceError;

/// Which end of the feed a fetch extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadDirection {
    /// Initial load (or reload) of a session.
    Refresh,
    /// Scroll backward, towards newer pages.
    Prepend,
    /// Scroll forward, towards older pages.
    Append,
}

impl LoadDirection {
    pub const ALL: [LoadDirection; 3] = [Self::Refresh, Self::Prepend, Self::Append];

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Refresh => 0,
            Self::Prepend => 1,
            Self::Append => 2,
        }
    }
}

impl fmt::Display for LoadDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Refresh => "refresh",
            Self::Prepend => "prepend",
            Self::Append => "append",
        })
    }
}

/// Load status of a single direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    NotLoading { end_of_data: bool },
    Loading,
    Error(SourceError),
}

impl LoadState {
    pub const IDLE: LoadState = LoadState::NotLoading { end_of_data: false };
    pub const EXHAUSTED: LoadState = LoadState::NotLoading { end_of_data: true };

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, LoadState::NotLoading { end_of_data: true })
    }

    pub fn error(&self) -> Option<&SourceError> {
        match self {
            LoadState::Error(cause) => Some(cause),
            LoadState::NotLoading { .. } | LoadState::Loading => None,
        }
    }
}

impl Default for LoadState {
    fn default() -> Self {
        Self::IDLE
    }
}

/// Load states for all three directions, as shown to the consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinedLoadState {
    pub refresh: LoadState,
    pub prepend: LoadState,
    pub append: LoadState,
}

impl CombinedLoadState {
    pub fn get(&self, direction: LoadDirection) -> &LoadState {
        match direction {
            LoadDirection::Refresh => &self.refresh,
            LoadDirection::Prepend => &self.prepend,
            LoadDirection::Append => &self.append,
        }
    }

    /// Directions currently in `Error`, with their causes, in
    /// refresh/prepend/append order. Which one to display is up to the consumer.
    pub fn errors(&self) -> impl Iterator<Item = (LoadDirection, &SourceError)> {
        LoadDirection::ALL
            .into_iter()
            .filter_map(move |d| self.get(d).error().map(|e| (d, e)))
    }

    pub fn has_error(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn is_loading(&self) -> bool {
        LoadDirection::ALL.iter().any(|d| self.get(*d).is_loading())
    }
}

/// A state update for one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadEvent {
    pub direction: LoadDirection,
    pub state: LoadState,
}

impl LoadEvent {
    pub fn new(direction: LoadDirection, state: LoadState) -> Self {
        Self { direction, state }
    }
}

/// Apply `event` to `previous`: the matching direction is replaced, the
/// other two are carried over untouched.
pub fn reduce(previous: &CombinedLoadState, event: &LoadEvent) -> CombinedLoadState {
    let mut next = previous.clone();
    let slot = match event.direction {
        LoadDirection::Refresh => &mut next.refresh,
        LoadDirection::Prepend => &mut next.prepend,
        LoadDirection::Append => &mut next.append,
    };
    *slot = event.state.clone();
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn arb_direction() -> impl Strategy<Value = LoadDirection> {
        prop_oneof![
            Just(LoadDirection::Refresh),
            Just(LoadDirection::Prepend),
            Just(LoadDirection::Append),
        ]
    }

    fn arb_state() -> impl Strategy<Value = LoadState> {
        prop_oneof![
            any::<bool>().prop_map(|end_of_data| LoadState::NotLoading { end_of_data }),
            Just(LoadState::Loading),
            "[a-z]{1,8}".prop_map(|m| LoadState::Error(SourceError::Network(m))),
            (400u16..600).prop_map(|s| LoadState::Error(SourceError::HttpStatus(s))),
        ]
    }

    fn arb_combined() -> impl Strategy<Value = CombinedLoadState> {
        (arb_state(), arb_state(), arb_state()).prop_map(|(refresh, prepend, append)| {
            CombinedLoadState {
                refresh,
                prepend,
                append,
            }
        })
    }

    #[test]
    fn test_reduce_replaces_only_matching_direction() {
        let previous = CombinedLoadState::default();
        let next = reduce(
            &previous,
            &LoadEvent::new(LoadDirection::Append, LoadState::Loading),
        );
        assert_eq!(
            next,
            CombinedLoadState {
                refresh: LoadState::IDLE,
                prepend: LoadState::IDLE,
                append: LoadState::Loading,
            }
        );
    }

    #[test]
    fn test_errors_in_direction_order() {
        let state = CombinedLoadState {
            refresh: LoadState::IDLE,
            prepend: LoadState::Error(SourceError::Timeout),
            append: LoadState::Error(SourceError::HttpStatus(503)),
        };
        let errors: Vec<_> = state.errors().map(|(d, _)| d).collect();
        assert_eq!(errors, vec![LoadDirection::Prepend, LoadDirection::Append]);
        assert!(state.has_error());
        assert!(!state.is_loading());
    }

    #[test]
    fn test_exhausted_predicate() {
        assert!(LoadState::EXHAUSTED.is_exhausted());
        assert!(!LoadState::IDLE.is_exhausted());
        assert!(!LoadState::Loading.is_exhausted());
    }

    proptest! {
        #[test]
        fn prop_reduce_touches_one_field(
            previous in arb_combined(),
            direction in arb_direction(),
            state in arb_state(),
        ) {
            let event = LoadEvent::new(direction, state.clone());
            let next = reduce(&previous, &event);
            for d in LoadDirection::ALL {
                if d == direction {
                    prop_assert_eq!(next.get(d), &state);
                } else {
                    prop_assert_eq!(next.get(d), previous.get(d));
                }
            }
        }

        #[test]
        fn prop_reduce_is_deterministic(
            previous in arb_combined(),
            direction in arb_direction(),
            state in arb_state(),
        ) {
            let event = LoadEvent::new(direction, state);
            prop_assert_eq!(reduce(&previous, &event), reduce(&previous, &event));
        }
    }
}
