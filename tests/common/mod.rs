#![allow(dead_code)]

pub mod strategies;

use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::Duration;
use tasker_plan::config::{ExecutionConfig, FailurePolicy};
use tasker_plan::execution::{PlanExecutor, WorkerLeaseService};
use tasker_plan::plan::{
    DependencyKind, ExecutionPlan, ExecutionPlanBuilder, Selection, WorkItem, WorkItemId,
    WorkSource,
};

pub use strategies::*;

/// Executor with short idle waits so tests finish quickly
pub fn test_executor(workers: usize, permits: usize) -> PlanExecutor {
    PlanExecutor::new(ExecutionConfig {
        worker_threads: workers,
        max_concurrent_items: permits,
        idle_wait_ms: 5,
        stall_warning_after_ms: 1_000,
        ..ExecutionConfig::default()
    })
}

/// Build a plan from a pattern; every item lands in one group and its payload
/// is its index.
pub fn pattern_plan(
    pattern: &WorkflowPattern,
    policy: FailurePolicy,
) -> (ExecutionPlan<usize>, Vec<WorkItemId>) {
    let mut builder = ExecutionPlanBuilder::new("pattern").failure_policy(policy);
    let group = builder.ordinal_group();
    let ids: Vec<WorkItemId> = (0..pattern.item_count())
        .map(|index| builder.add_item(group, format!(":item{index}"), index))
        .collect();
    for (from, to) in pattern.edges() {
        builder.add_dependency(ids[to], ids[from]);
    }
    (builder.build().expect("pattern plan builds"), ids)
}

/// Build a plan from a random DAG; payload is the item index
pub fn random_plan(dag: &RandomDag, policy: FailurePolicy) -> (ExecutionPlan<usize>, Vec<WorkItemId>) {
    let mut builder = ExecutionPlanBuilder::new("random").failure_policy(policy);
    let groups: Vec<_> = (0..dag.group_count).map(|_| builder.ordinal_group()).collect();
    let ids: Vec<WorkItemId> = (0..dag.item_count)
        .map(|index| builder.add_item(groups[dag.groups[index]], format!(":item{index}"), index))
        .collect();
    for (from, to, kind) in &dag.edges {
        match kind {
            DependencyKind::Hard => builder.add_dependency(ids[*to], ids[*from]),
            DependencyKind::Ordering => builder.add_ordering(ids[*to], ids[*from]),
        };
    }
    (builder.build().expect("random plan builds"), ids)
}

/// Select the next item with a fresh permit, panicking if none is ready
pub fn select<T: Send + Sync + std::fmt::Debug>(
    plan: &ExecutionPlan<T>,
    leases: &WorkerLeaseService,
) -> WorkItem<T> {
    let permit = leases.acquire();
    match plan.select_next(&permit) {
        Selection::Item(item) => item,
        other => panic!("expected a ready item, got {other:?}"),
    }
}

/// Action that records the order items start and finish in, failing the
/// items whose payload is listed.
#[derive(Debug, Default)]
pub struct RecordingAction {
    pub events: Mutex<Vec<(usize, &'static str)>>,
    pub failing: HashSet<usize>,
    pub delay: Option<Duration>,
}

impl RecordingAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failing: impl IntoIterator<Item = usize>) -> Self {
        Self {
            failing: failing.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn run(&self, item: &WorkItem<usize>) -> anyhow::Result<()> {
        let index = *item.payload();
        self.events.lock().push((index, "start"));
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.events.lock().push((index, "finish"));
        if self.failing.contains(&index) {
            anyhow::bail!("{} failed", item.name());
        }
        Ok(())
    }

    /// Items in the order they started
    pub fn started(&self) -> Vec<usize> {
        self.events
            .lock()
            .iter()
            .filter(|(_, event)| *event == "start")
            .map(|(index, _)| *index)
            .collect()
    }

    /// Position of an event in the log
    pub fn position(&self, index: usize, event: &str) -> Option<usize> {
        self.events
            .lock()
            .iter()
            .position(|(recorded, kind)| *recorded == index && *kind == event)
    }
}
