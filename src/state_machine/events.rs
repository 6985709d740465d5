use serde::{Deserialize, Serialize};

/// Events that can trigger work item state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeEvent {
    /// Plan construction queued the item
    Schedule,
    /// Every dependency reached a terminal state
    DependenciesSatisfied,
    /// A worker claimed the item
    Select,
    /// The worker began running the item's action
    Start,
    /// The action finished successfully
    Succeed,
    /// The action reported a failure
    Fail,
    /// Cancellation, abort or upstream failure
    Skip,
}

impl NodeEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Schedule => "schedule",
            Self::DependenciesSatisfied => "dependencies_satisfied",
            Self::Select => "select",
            Self::Start => "start",
            Self::Succeed => "succeed",
            Self::Fail => "fail",
            Self::Skip => "skip",
        }
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeed | Self::Fail | Self::Skip)
    }

    /// Check if this event reports the outcome of a selected item
    pub fn is_outcome(&self) -> bool {
        matches!(self, Self::Succeed | Self::Fail)
    }
}
