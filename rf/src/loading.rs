//! Loading state for one resource and aggregation across several

use std::collections::BTreeMap;
use std::fmt;

/// Fetch status of one resource
///
/// `Idle` covers both "never failed" and "last fetch succeeded". Because the
/// error lives inside `Failed`, a resource can never be loading and failed at
/// the same time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadingState {
    #[default]
    Idle,
    Loading,
    Failed(String),
}

impl LoadingState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadingState::Loading)
    }

    /// Message of the most recent failure, if the last fetch failed
    pub fn error(&self) -> Option<&str> {
        match self {
            LoadingState::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LoadingState::Failed(_))
    }
}

impl fmt::Display for LoadingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadingState::Idle => write!(f, "ready"),
            LoadingState::Loading => write!(f, "loading"),
            LoadingState::Failed(message) => write!(f, "failed: {}", message),
        }
    }
}

/// Loading state of several independently fetched resources, by key
///
/// The flags are derived from the current entries on every call, so a key
/// that recovers from a failure immediately stops counting as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingMap<K: Ord> {
    entries: BTreeMap<K, LoadingState>,
}

impl<K: Ord> Default for LoadingMap<K> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone> LoadingMap<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the state of `key`, returning the previous one
    pub fn insert(&mut self, key: K, state: LoadingState) -> Option<LoadingState> {
        self.entries.insert(key, state)
    }

    pub fn get(&self, key: &K) -> Option<&LoadingState> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True while at least one key is fetching
    pub fn is_any_loading(&self) -> bool {
        self.entries.values().any(LoadingState::is_loading)
    }

    /// True iff at least one key's most recent fetch failed
    pub fn has_any_error(&self) -> bool {
        self.entries.values().any(LoadingState::is_failed)
    }

    /// True when every key is idle (no fetch in flight, no failure)
    pub fn is_all_idle(&self) -> bool {
        self.entries.values().all(|state| *state == LoadingState::Idle)
    }

    /// Keys whose most recent fetch failed, with their messages
    pub fn errors(&self) -> Vec<(K, String)> {
        self.entries
            .iter()
            .filter_map(|(key, state)| state.error().map(|message| (key.clone(), message.to_string())))
            .collect()
    }
}

impl<K: Ord> FromIterator<(K, LoadingState)> for LoadingMap<K> {
    fn from_iter<I: IntoIterator<Item = (K, LoadingState)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
