use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Stable identity of a work item within one plan (insertion order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkItemId(pub(crate) usize);

impl WorkItemId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position of an ordinal group in request order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrdinalGroupId(pub(crate) usize);

impl OrdinalGroupId {
    pub fn ordinal(&self) -> usize {
        self.0
    }
}

impl fmt::Display for OrdinalGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group {}", self.0)
    }
}

/// Kind of constraint an edge places on its source item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// Mandatory: a failed target skips the source
    Hard,
    /// Ordering only ("must run after"): the target just has to be terminal
    Ordering,
}

/// Handle to a work item handed out by [`select_next`](super::WorkSource::select_next).
///
/// Cheap to clone; the payload is shared with the plan.
#[derive(Debug)]
pub struct WorkItem<T> {
    pub(crate) plan_id: Uuid,
    pub(crate) id: WorkItemId,
    pub(crate) group: OrdinalGroupId,
    pub(crate) name: Arc<str>,
    pub(crate) payload: Arc<T>,
}

impl<T> WorkItem<T> {
    pub fn id(&self) -> WorkItemId {
        self.id
    }

    pub fn ordinal_group(&self) -> OrdinalGroupId {
        self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Plan that handed out this item
    pub fn plan_id(&self) -> Uuid {
        self.plan_id
    }
}

impl<T> Clone for WorkItem<T> {
    fn clone(&self) -> Self {
        Self {
            plan_id: self.plan_id,
            id: self.id,
            group: self.group,
            name: Arc::clone(&self.name),
            payload: Arc::clone(&self.payload),
        }
    }
}

impl<T> PartialEq for WorkItem<T> {
    fn eq(&self, other: &Self) -> bool {
        self.plan_id == other.plan_id && self.id == other.id
    }
}

impl<T> Eq for WorkItem<T> {}

impl<T> fmt::Display for WorkItem<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
