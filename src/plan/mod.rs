//! # Execution Plan
//!
//! Work graph construction and the thread-safe [`WorkSource`] contract that
//! workers use to pull ready items out of it.
//!
//! ## Scheduling rules
//!
//! - An item becomes ready once every dependency is terminal.
//! - Among ready items the lowest ordinal group wins, then insertion order.
//! - A failed or skipped hard dependency skips the items waiting on it.
//! - With [`FailurePolicy::FailFast`](crate::config::FailurePolicy) the first
//!   failure skips all work not yet started.

mod builder;
mod execution_plan;
mod failure;
mod notifier;
mod ordinal_group;
mod selection;
mod work_item;
mod work_source;

pub use builder::ExecutionPlanBuilder;
pub use execution_plan::{ExecutionPlan, PlanCounts};
pub use failure::{FailureKind, PlanFailure};
pub use ordinal_group::OrdinalGroup;
pub use selection::{ExecutionState, Selection};
pub use work_item::{DependencyKind, OrdinalGroupId, WorkItem, WorkItemId};
pub use work_source::WorkSource;
