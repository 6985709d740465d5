use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::execution_plan::{Edge, ExecutionPlan, Node};
use super::work_item::{DependencyKind, OrdinalGroupId, WorkItemId};
use crate::config::{FailurePolicy, PlanConfig};
use crate::constants::system;
use crate::error::{PlanError, Result};

struct PendingItem<T> {
    name: Arc<str>,
    payload: Arc<T>,
    group: OrdinalGroupId,
}

/// Assembles the work graph for an [`ExecutionPlan`].
///
/// Item and group ids are handed out in insertion order, which is also the
/// tie-break order among equally ready items. Cycles are not detected here;
/// the plan reports them as unreachable work at run time.
///
/// ```rust
/// use tasker_plan::plan::ExecutionPlanBuilder;
///
/// # fn main() -> tasker_plan::Result<()> {
/// let mut builder = ExecutionPlanBuilder::new("build");
/// let group = builder.ordinal_group();
/// let compile = builder.add_item(group, ":compileJava", ());
/// let test = builder.add_item(group, ":test", ());
/// builder.add_dependency(test, compile);
/// let plan = builder.build()?;
/// assert_eq!(plan.len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct ExecutionPlanBuilder<T> {
    display_name: String,
    failure_policy: FailurePolicy,
    max_items_listed: usize,
    group_count: usize,
    items: Vec<PendingItem<T>>,
    // (source, target) -> kind
    edges: BTreeMap<(usize, usize), DependencyKind>,
}

impl<T> ExecutionPlanBuilder<T> {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            failure_policy: FailurePolicy::default(),
            max_items_listed: system::DEFAULT_MAX_DIAGNOSTIC_ITEMS,
            group_count: 0,
            items: Vec::new(),
            edges: BTreeMap::new(),
        }
    }

    /// Take the failure policy and diagnostics limits from loaded configuration
    pub fn with_config(mut self, config: &PlanConfig) -> Self {
        self.failure_policy = config.execution.failure_policy;
        self.max_items_listed = config.diagnostics.max_items_listed;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Open a new ordinal group, ordered after every group opened before it
    pub fn ordinal_group(&mut self) -> OrdinalGroupId {
        let id = OrdinalGroupId(self.group_count);
        self.group_count += 1;
        id
    }

    pub fn add_item(&mut self, group: OrdinalGroupId, name: impl Into<String>, payload: T) -> WorkItemId {
        let id = WorkItemId(self.items.len());
        self.items.push(PendingItem {
            name: Arc::from(name.into()),
            payload: Arc::new(payload),
            group,
        });
        id
    }

    /// `item` may only start once `depends_on` is terminal, and is skipped if
    /// `depends_on` does not succeed.
    pub fn add_dependency(&mut self, item: WorkItemId, depends_on: WorkItemId) -> &mut Self {
        self.edges
            .insert((item.0, depends_on.0), DependencyKind::Hard);
        self
    }

    /// `item` may only start once `must_run_after` is terminal. Under
    /// [`FailurePolicy::ContinueOnFailure`] a failure of `must_run_after`
    /// does not skip `item`.
    pub fn add_ordering(&mut self, item: WorkItemId, must_run_after: WorkItemId) -> &mut Self {
        self.edges
            .entry((item.0, must_run_after.0))
            .or_insert(DependencyKind::Ordering);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Validate ids and freeze the graph into a schedulable plan
    pub fn build(self) -> Result<ExecutionPlan<T>> {
        let item_count = self.items.len();

        if let Some(item) = self
            .items
            .iter()
            .find(|item| item.group.0 >= self.group_count)
        {
            return Err(PlanError::InvalidGraph(format!(
                "{} belongs to unknown {}",
                item.name, item.group
            )));
        }

        if let Some(&(source, target)) = self
            .edges
            .keys()
            .find(|(source, target)| *source >= item_count || *target >= item_count)
        {
            return Err(PlanError::InvalidGraph(format!(
                "edge {} -> {} references an unknown work item",
                WorkItemId(source),
                WorkItemId(target)
            )));
        }

        let mut dependencies: Vec<Vec<Edge>> = (0..item_count).map(|_| Vec::new()).collect();
        let mut dependents: Vec<Vec<Edge>> = (0..item_count).map(|_| Vec::new()).collect();
        for (&(source, target), &kind) in &self.edges {
            dependencies[source].push(Edge { node: target, kind });
            dependents[target].push(Edge { node: source, kind });
        }

        let mut group_sizes = vec![0usize; self.group_count];
        let nodes: Vec<Node<T>> = self
            .items
            .into_iter()
            .zip(dependencies.into_iter().zip(dependents))
            .map(|(item, (dependencies, dependents))| {
                group_sizes[item.group.0] += 1;
                Node::new(item.name, item.payload, item.group, dependencies, dependents)
            })
            .collect();

        debug!(
            plan = %self.display_name,
            items = item_count,
            edges = self.edges.len(),
            ordinal_groups = self.group_count,
            "Building execution plan"
        );

        Ok(ExecutionPlan::new(
            self.display_name,
            self.failure_policy,
            self.max_items_listed,
            nodes,
            group_sizes,
        ))
    }
}
