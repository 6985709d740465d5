use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse state of a work source, cheap enough to poll between selections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    /// There may be work ready to start. `select_next` is likely, not
    /// guaranteed, to return an item: another worker may take it first.
    MaybeWorkReadyToStart,
    /// Items are still queued but none can start yet; wait for a change.
    NoWorkReadyToStart,
    /// Nothing will ever start again. In-flight work may still be running.
    NoMoreWorkToStart,
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaybeWorkReadyToStart => write!(f, "maybe_work_ready_to_start"),
            Self::NoWorkReadyToStart => write!(f, "no_work_ready_to_start"),
            Self::NoMoreWorkToStart => write!(f, "no_more_work_to_start"),
        }
    }
}

/// Outcome of a single `select_next` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    /// The caller now owns this item and must report it via `finished_executing`
    Item(T),
    NoWorkReadyToStart,
    NoMoreWorkToStart,
}

impl<T> Selection<T> {
    pub fn is_item(&self) -> bool {
        matches!(self, Self::Item(_))
    }

    pub fn is_no_work_ready_to_start(&self) -> bool {
        matches!(self, Self::NoWorkReadyToStart)
    }

    pub fn is_no_more_work_to_start(&self) -> bool {
        matches!(self, Self::NoMoreWorkToStart)
    }

    pub fn item(&self) -> Option<&T> {
        match self {
            Self::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn into_item(self) -> Option<T> {
        match self {
            Self::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Selection<U> {
        match self {
            Self::Item(item) => Selection::Item(f(item)),
            Self::NoWorkReadyToStart => Selection::NoWorkReadyToStart,
            Self::NoMoreWorkToStart => Selection::NoMoreWorkToStart,
        }
    }
}
