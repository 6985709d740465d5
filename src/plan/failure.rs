use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::work_item::WorkItemId;

/// What a failure record is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A work item's action reported an error
    ItemFailed,
    /// The whole plan was aborted
    PlanAborted,
    /// Queued items can never start (the graph contains a cycle)
    Unreachable,
}

/// An append-only failure record.
///
/// The cause is stored verbatim and shared, so collected copies point at the
/// same error value the action returned.
#[derive(Debug, Clone)]
pub struct PlanFailure {
    item: Option<WorkItemId>,
    item_name: Option<String>,
    kind: FailureKind,
    cause: Arc<anyhow::Error>,
    recorded_at: DateTime<Utc>,
}

impl PlanFailure {
    pub(crate) fn item_failed(item: WorkItemId, name: &str, cause: anyhow::Error) -> Self {
        Self {
            item: Some(item),
            item_name: Some(name.to_string()),
            kind: FailureKind::ItemFailed,
            cause: Arc::new(cause),
            recorded_at: Utc::now(),
        }
    }

    pub(crate) fn plan_level(kind: FailureKind, cause: anyhow::Error) -> Self {
        Self {
            item: None,
            item_name: None,
            kind,
            cause: Arc::new(cause),
            recorded_at: Utc::now(),
        }
    }

    pub fn item(&self) -> Option<WorkItemId> {
        self.item
    }

    pub fn item_name(&self) -> Option<&str> {
        self.item_name.as_deref()
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    /// True when this record and `other` share the same cause value
    pub fn same_cause(&self, other: &PlanFailure) -> bool {
        Arc::ptr_eq(&self.cause, &other.cause)
    }
}

impl fmt::Display for PlanFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.item_name) {
            (FailureKind::ItemFailed, Some(name)) => {
                write!(f, "Execution failed for {name}: {:#}", self.cause)
            }
            (FailureKind::Unreachable, _) => {
                write!(f, "Work can never start: {:#}", self.cause)
            }
            _ => write!(f, "Plan aborted: {:#}", self.cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_failure_display() {
        let failure = PlanFailure::item_failed(WorkItemId(3), ":compileJava", anyhow::anyhow!("boom"));
        assert_eq!(failure.kind(), FailureKind::ItemFailed);
        assert_eq!(failure.item(), Some(WorkItemId(3)));
        assert_eq!(failure.to_string(), "Execution failed for :compileJava: boom");
    }

    #[test]
    fn test_clones_share_cause() {
        let failure = PlanFailure::plan_level(FailureKind::PlanAborted, anyhow::anyhow!("stop"));
        let copy = failure.clone();
        assert!(failure.same_cause(&copy));
        assert_eq!(copy.to_string(), "Plan aborted: stop");
        assert!(copy.item_name().is_none());
    }
}
