use serde::{Deserialize, Serialize};
use std::fmt;

/// Work item state definitions
///
/// States only move forward. `Skipped` may be entered from any non-terminal
/// state when the plan is cancelled, aborted, or an upstream item failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum NodeState {
    /// Item is known to the plan but has not been scheduled yet
    NotScheduled = 0,
    /// Item is scheduled and waiting on its dependencies
    Queued = 1,
    /// Every dependency is terminal; the item may be selected
    MaybeReady = 2,
    /// A worker has claimed the item
    Selected = 3,
    /// The worker is running the item's action
    Executing = 4,
    /// Action completed successfully
    Succeeded = 5,
    /// Action reported a failure
    Failed = 6,
    /// Item will never run
    Skipped = 7,
}

impl From<u8> for NodeState {
    fn from(value: u8) -> Self {
        match value {
            0 => NodeState::NotScheduled,
            1 => NodeState::Queued,
            2 => NodeState::MaybeReady,
            3 => NodeState::Selected,
            4 => NodeState::Executing,
            5 => NodeState::Succeeded,
            6 => NodeState::Failed,
            _ => NodeState::Skipped,
        }
    }
}

impl NodeState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }

    /// Check if the item has not been claimed by a worker yet
    pub fn is_unstarted(&self) -> bool {
        matches!(self, Self::NotScheduled | Self::Queued | Self::MaybeReady)
    }

    /// Check if a worker currently owns the item
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Selected | Self::Executing)
    }

    /// Check if the item is waiting in the plan's queue
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued | Self::MaybeReady)
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotScheduled => write!(f, "not_scheduled"),
            Self::Queued => write!(f, "queued"),
            Self::MaybeReady => write!(f, "maybe_ready"),
            Self::Selected => write!(f, "selected"),
            Self::Executing => write!(f, "executing"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl std::str::FromStr for NodeState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_scheduled" => Ok(Self::NotScheduled),
            "queued" => Ok(Self::Queued),
            "maybe_ready" => Ok(Self::MaybeReady),
            "selected" => Ok(Self::Selected),
            "executing" => Ok(Self::Executing),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            _ => Err(format!("Invalid node state: {s}")),
        }
    }
}

/// Default state for new work items
impl Default for NodeState {
    fn default() -> Self {
        Self::NotScheduled
    }
}
