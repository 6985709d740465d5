//! # Execution Plan
//!
//! The in-memory scheduler behind [`WorkSource`]. Structural data (names,
//! payloads, edges) is immutable after [`ExecutionPlanBuilder::build`]; all
//! mutable scheduling state sits behind one `parking_lot::Mutex`, so every
//! transition and its bookkeeping happen atomically with respect to other
//! workers. Each node additionally mirrors its state into an `AtomicU8`,
//! written under the lock and read lock-free by diagnostics.
//!
//! [`ExecutionPlanBuilder::build`]: super::ExecutionPlanBuilder::build

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument, trace, warn};
use uuid::Uuid;

use super::failure::{FailureKind, PlanFailure};
use super::notifier::ChangeNotifier;
use super::ordinal_group::OrdinalGroup;
use super::selection::{ExecutionState, Selection};
use super::work_item::{DependencyKind, OrdinalGroupId, WorkItem, WorkItemId};
use super::work_source::WorkSource;
use crate::config::FailurePolicy;
use crate::diagnostics::Diagnostics;
use crate::error::{PlanError, Result};
use crate::execution::WorkerPermit;
use crate::state_machine::{NodeEvent, NodeState, NodeStateMachine, StateMachineResult};

#[derive(Debug, Clone, Copy)]
pub(crate) struct Edge {
    pub(crate) node: usize,
    pub(crate) kind: DependencyKind,
}

pub(crate) struct Node<T> {
    name: Arc<str>,
    payload: Arc<T>,
    group: OrdinalGroupId,
    /// Items this node waits for
    dependencies: Vec<Edge>,
    /// Items waiting for this node
    dependents: Vec<Edge>,
    state: AtomicU8,
}

impl<T> Node<T> {
    pub(crate) fn new(
        name: Arc<str>,
        payload: Arc<T>,
        group: OrdinalGroupId,
        dependencies: Vec<Edge>,
        dependents: Vec<Edge>,
    ) -> Self {
        Self {
            name,
            payload,
            group,
            dependencies,
            dependents,
            state: AtomicU8::new(NodeState::NotScheduled as u8),
        }
    }

    fn state(&self) -> NodeState {
        NodeState::from(self.state.load(Ordering::Acquire))
    }
}

/// Point-in-time tallies of item states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCounts {
    /// Items in `Queued` or `MaybeReady`
    pub queued: usize,
    /// Items in `MaybeReady`
    pub ready: usize,
    /// Items in `Selected` or `Executing`
    pub in_flight: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl PlanCounts {
    pub fn finished(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

struct PlanState {
    pending_dependencies: Vec<usize>,
    /// MaybeReady items per ordinal group, lowest id first
    ready: Vec<BTreeSet<usize>>,
    counts: PlanCounts,
    failures: Vec<PlanFailure>,
    cancelled: bool,
    aborted: bool,
    unreachable_reported: bool,
}

/// A thread-safe dependency graph of work items with per-item state.
///
/// Built with [`ExecutionPlanBuilder`](super::ExecutionPlanBuilder) and
/// driven through its [`WorkSource`] implementation.
pub struct ExecutionPlan<T> {
    plan_id: Uuid,
    display_name: String,
    failure_policy: FailurePolicy,
    max_items_listed: usize,
    nodes: Vec<Node<T>>,
    groups: Vec<OrdinalGroup>,
    state: Mutex<PlanState>,
    notifier: ChangeNotifier,
}

impl<T> ExecutionPlan<T> {
    pub(crate) fn new(
        display_name: String,
        failure_policy: FailurePolicy,
        max_items_listed: usize,
        nodes: Vec<Node<T>>,
        group_sizes: Vec<usize>,
    ) -> Self {
        let groups = group_sizes
            .iter()
            .enumerate()
            .map(|(ordinal, &items)| OrdinalGroup::new(OrdinalGroupId(ordinal), items))
            .collect();
        let state = PlanState {
            pending_dependencies: nodes.iter().map(|node| node.dependencies.len()).collect(),
            ready: group_sizes.iter().map(|_| BTreeSet::new()).collect(),
            counts: PlanCounts::default(),
            failures: Vec::new(),
            cancelled: false,
            aborted: false,
            unreachable_reported: false,
        };

        let plan = Self {
            plan_id: Uuid::new_v4(),
            display_name,
            failure_policy,
            max_items_listed,
            nodes,
            groups,
            state: Mutex::new(state),
            notifier: ChangeNotifier::new(),
        };
        plan.schedule_all();
        plan
    }

    fn schedule_all(&self) {
        let mut state = self.state.lock();
        for index in 0..self.nodes.len() {
            self.apply_logged(&mut state, index, NodeEvent::Schedule);
        }
        for index in 0..self.nodes.len() {
            if state.pending_dependencies[index] == 0 {
                self.apply_logged(&mut state, index, NodeEvent::DependenciesSatisfied);
            }
        }
        self.check_for_unreachable_work(&mut state);
    }

    pub fn plan_id(&self) -> Uuid {
        self.plan_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ordinal_groups(&self) -> &[OrdinalGroup] {
        &self.groups
    }

    /// Lock-free read of an item's state
    pub fn node_state(&self, item: WorkItemId) -> Option<NodeState> {
        self.nodes.get(item.0).map(Node::state)
    }

    /// Handle to an item, whatever its state
    pub fn item(&self, item: WorkItemId) -> Option<WorkItem<T>> {
        (item.0 < self.nodes.len()).then(|| self.handle(item.0))
    }

    /// Ids of the items `item` waits for
    pub fn dependencies_of(&self, item: WorkItemId) -> Vec<WorkItemId> {
        self.nodes
            .get(item.0)
            .map(|node| node.dependencies.iter().map(|edge| WorkItemId(edge.node)).collect())
            .unwrap_or_default()
    }

    pub fn counts(&self) -> PlanCounts {
        self.state.lock().counts
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    pub fn is_aborted(&self) -> bool {
        self.state.lock().aborted
    }

    fn handle(&self, index: usize) -> WorkItem<T> {
        let node = &self.nodes[index];
        WorkItem {
            plan_id: self.plan_id,
            id: WorkItemId(index),
            group: node.group,
            name: Arc::clone(&node.name),
            payload: Arc::clone(&node.payload),
        }
    }

    /// Run one transition and keep counters, ready sets and group tallies in step
    fn apply(
        &self,
        state: &mut PlanState,
        index: usize,
        event: NodeEvent,
    ) -> StateMachineResult<NodeState> {
        let node = &self.nodes[index];
        let from = node.state();
        let to = NodeStateMachine::determine_target_state(from, event)?;
        node.state.store(to as u8, Ordering::Release);

        let group = node.group.0;
        let counts = &mut state.counts;

        if from == NodeState::MaybeReady && state.ready[group].remove(&index) {
            counts.ready -= 1;
        }
        if to == NodeState::MaybeReady && state.ready[group].insert(index) {
            counts.ready += 1;
        }
        match (from.is_queued(), to.is_queued()) {
            (false, true) => counts.queued += 1,
            (true, false) => counts.queued -= 1,
            _ => {}
        }
        if from.is_unstarted() && !to.is_unstarted() {
            self.groups[group].item_started();
        }
        if to == NodeState::Selected {
            counts.in_flight += 1;
        }
        if from.is_in_flight() && to.is_terminal() {
            counts.in_flight -= 1;
        }
        match to {
            NodeState::Succeeded => counts.succeeded += 1,
            NodeState::Failed => counts.failed += 1,
            NodeState::Skipped => counts.skipped += 1,
            _ => {}
        }
        if to.is_terminal() {
            self.groups[group].item_finished();
        }

        trace!(
            plan = %self.display_name,
            item = %node.name,
            event = event.event_type(),
            from = %from,
            to = %to,
            "Work item transition"
        );
        Ok(to)
    }

    /// Transitions driven by the plan itself are always legal. A rejected one
    /// is a scheduler bug: it panics in debug builds and is logged in release.
    fn apply_logged(&self, state: &mut PlanState, index: usize, event: NodeEvent) -> bool {
        match self.apply(state, index, event) {
            Ok(_) => true,
            Err(err) => {
                error!(
                    plan = %self.display_name,
                    item = %self.nodes[index].name,
                    error = %err,
                    "Rejected internal work item transition"
                );
                debug_assert!(
                    false,
                    "rejected internal transition for {}: {err}",
                    self.nodes[index].name
                );
                false
            }
        }
    }

    fn next_ready(state: &PlanState) -> Option<usize> {
        state.ready.iter().find_map(|ready| ready.first().copied())
    }

    fn evaluate(state: &PlanState) -> ExecutionState {
        if state.counts.ready > 0 {
            ExecutionState::MaybeWorkReadyToStart
        } else if state.counts.queued > 0 && state.counts.in_flight > 0 {
            ExecutionState::NoWorkReadyToStart
        } else {
            ExecutionState::NoMoreWorkToStart
        }
    }

    /// Release or skip the dependents of a node that just became terminal.
    ///
    /// Iterative so long dependency chains cannot overflow the stack.
    fn propagate_completion(&self, state: &mut PlanState, index: usize, succeeded: bool) {
        let mut worklist = vec![(index, succeeded)];
        while let Some((completed, ok)) = worklist.pop() {
            for edge in &self.nodes[completed].dependents {
                let dependent = edge.node;
                let current = self.nodes[dependent].state();
                if !current.is_queued() {
                    continue;
                }

                if !ok
                    && (edge.kind == DependencyKind::Hard
                        || !self.failure_policy.continues_on_failure())
                {
                    if self.apply_logged(state, dependent, NodeEvent::Skip) {
                        debug!(
                            plan = %self.display_name,
                            item = %self.nodes[dependent].name,
                            dependency = %self.nodes[completed].name,
                            "Skipping work item, dependency did not succeed"
                        );
                        worklist.push((dependent, false));
                    }
                    continue;
                }

                let remaining = {
                    let pending = &mut state.pending_dependencies[dependent];
                    *pending = pending.saturating_sub(1);
                    *pending
                };
                if remaining == 0 && current == NodeState::Queued {
                    self.apply_logged(state, dependent, NodeEvent::DependenciesSatisfied);
                }
            }
        }
    }

    fn skip_unstarted(&self, state: &mut PlanState) -> usize {
        (0..self.nodes.len())
            .filter(|&index| self.nodes[index].state().is_unstarted())
            .filter(|&index| self.apply_logged(state, index, NodeEvent::Skip))
            .count()
    }

    /// Record a single failure when queued work can never become ready
    fn check_for_unreachable_work(&self, state: &mut PlanState) {
        let counts = state.counts;
        if state.unreachable_reported
            || counts.queued == 0
            || counts.ready > 0
            || counts.in_flight > 0
        {
            return;
        }
        state.unreachable_reported = true;

        let stuck: Vec<&str> = self
            .nodes
            .iter()
            .filter(|node| node.state().is_queued())
            .map(|node| node.name.as_ref())
            .collect();
        let listed = self.limit(stuck.iter().map(|name| name.to_string()).collect());
        error!(
            plan = %self.display_name,
            stuck_items = stuck.len(),
            "Queued work can never start, the dependency graph contains a cycle"
        );
        state.failures.push(PlanFailure::plan_level(
            FailureKind::Unreachable,
            anyhow::anyhow!(
                "{} work item(s) wait on dependencies that can never complete: {}",
                stuck.len(),
                listed.join(", ")
            ),
        ));
    }

    fn contract_violation(&self, item: &WorkItem<T>, reason: &str) -> PlanError {
        error!(
            plan = %self.display_name,
            item = %item.name,
            reason = reason,
            "Work source contract violation"
        );
        PlanError::ContractViolation(format!("{} {reason}", item.name))
    }

    /// Confirm the handle belongs to this plan and return its node index
    fn resolve(&self, item: &WorkItem<T>) -> Result<usize> {
        if item.plan_id != self.plan_id || item.id.0 >= self.nodes.len() {
            return Err(self.contract_violation(item, "does not belong to this plan"));
        }
        Ok(item.id.0)
    }

    fn limit(&self, mut lines: Vec<String>) -> Vec<String> {
        if self.max_items_listed > 0 && lines.len() > self.max_items_listed {
            let hidden = lines.len() - self.max_items_listed;
            lines.truncate(self.max_items_listed);
            lines.push(format!("... and {hidden} more"));
        }
        lines
    }
}

impl<T: Send + Sync> WorkSource<WorkItem<T>> for ExecutionPlan<T> {
    fn execution_state(&self) -> ExecutionState {
        // A contended lock means another worker is mid-transition; answering
        // "maybe" keeps this call non-blocking and never reports false "done".
        match self.state.try_lock() {
            Some(state) => Self::evaluate(&state),
            None => ExecutionState::MaybeWorkReadyToStart,
        }
    }

    fn select_next(&self, permit: &WorkerPermit) -> Selection<WorkItem<T>> {
        let mut state = self.state.lock();

        while let Some(index) = Self::next_ready(&state) {
            if self.apply_logged(&mut state, index, NodeEvent::Select) {
                drop(state);
                let item = self.handle(index);
                debug!(
                    plan = %self.display_name,
                    item = %item.name,
                    group = item.group.0,
                    lease_id = permit.lease_id(),
                    "Selected work item"
                );
                return Selection::Item(item);
            }
            let group = self.nodes[index].group.0;
            if state.ready[group].remove(&index) {
                state.counts.ready -= 1;
            }
        }

        if state.counts.queued == 0 {
            return Selection::NoMoreWorkToStart;
        }
        if state.counts.in_flight > 0 {
            return Selection::NoWorkReadyToStart;
        }
        self.check_for_unreachable_work(&mut state);
        Selection::NoMoreWorkToStart
    }

    fn started_executing(&self, item: &WorkItem<T>) -> Result<()> {
        let index = self.resolve(item)?;
        let mut state = self.state.lock();
        if self.nodes[index].state() != NodeState::Selected {
            return Err(self.contract_violation(item, "was started without being selected"));
        }
        self.apply(&mut state, index, NodeEvent::Start)?;
        Ok(())
    }

    #[instrument(skip(self, item, failure), fields(plan = %self.display_name, item = %item.name))]
    fn finished_executing(&self, item: &WorkItem<T>, failure: Option<anyhow::Error>) -> Result<()> {
        let index = self.resolve(item)?;
        let mut state = self.state.lock();

        let current = self.nodes[index].state();
        if !current.is_in_flight() {
            return Err(self.contract_violation(
                item,
                &format!("was reported finished while {current}"),
            ));
        }

        match failure {
            None => {
                self.apply(&mut state, index, NodeEvent::Succeed)?;
                self.propagate_completion(&mut state, index, true);
            }
            Some(cause) => {
                self.apply(&mut state, index, NodeEvent::Fail)?;
                warn!(error = %format!("{cause:#}"), "Work item failed");
                state
                    .failures
                    .push(PlanFailure::item_failed(item.id, &item.name, cause));
                if self.failure_policy.continues_on_failure() {
                    self.propagate_completion(&mut state, index, false);
                } else {
                    let skipped = self.skip_unstarted(&mut state);
                    debug!(skipped = skipped, "Fail-fast skipped remaining work");
                }
            }
        }

        self.check_for_unreachable_work(&mut state);
        drop(state);
        self.notifier.notify_all();
        Ok(())
    }

    #[instrument(skip(self, cause), fields(plan = %self.display_name))]
    fn abort_all_and_fail(&self, cause: anyhow::Error) {
        let mut state = self.state.lock();
        let skipped = self.skip_unstarted(&mut state);
        state.aborted = true;
        warn!(skipped = skipped, cause = %format!("{cause:#}"), "Aborting execution plan");
        state
            .failures
            .push(PlanFailure::plan_level(FailureKind::PlanAborted, cause));
        drop(state);
        self.notifier.notify_all();
    }

    #[instrument(skip(self), fields(plan = %self.display_name))]
    fn cancel_execution(&self) {
        let mut state = self.state.lock();
        let skipped = self.skip_unstarted(&mut state);
        state.cancelled = true;
        debug!(skipped = skipped, "Cancelled execution plan");
        drop(state);
        self.notifier.notify_all();
    }

    fn all_execution_complete(&self) -> bool {
        let state = self.state.lock();
        state.counts.in_flight == 0 && Self::evaluate(&state) == ExecutionState::NoMoreWorkToStart
    }

    fn collect_failures(&self, failures: &mut Vec<PlanFailure>) {
        failures.extend(self.state.lock().failures.iter().cloned());
    }

    fn health_diagnostics(&self) -> Diagnostics {
        let mut queued = Vec::new();
        let mut other = Vec::new();
        let mut by_group: Vec<&Node<T>> = self.nodes.iter().collect();
        by_group.sort_by_key(|node| node.group);
        for node in by_group {
            let state = node.state();
            if state.is_queued() {
                let waiting_on: Vec<&str> = node
                    .dependencies
                    .iter()
                    .map(|edge| &self.nodes[edge.node])
                    .filter(|dependency| !dependency.state().is_terminal())
                    .map(|dependency| dependency.name.as_ref())
                    .collect();
                if waiting_on.is_empty() {
                    queued.push(format!("{} {} ({state})", node.group, node.name));
                } else {
                    queued.push(format!(
                        "{} {} ({state}, waiting on: {})",
                        node.group,
                        node.name,
                        waiting_on.join(", ")
                    ));
                }
            } else {
                other.push(format!("{} {} ({state})", node.group, node.name));
            }
        }

        Diagnostics::new(
            self.display_name.clone(),
            self.groups.iter().map(ToString::to_string).collect(),
            self.limit(queued),
            self.limit(other),
        )
    }

    fn change_generation(&self) -> u64 {
        self.notifier.generation()
    }

    fn await_change(&self, observed: u64, timeout: Duration) -> bool {
        self.notifier.await_change(observed, timeout)
    }
}

impl<T> fmt::Debug for ExecutionPlan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionPlan")
            .field("plan_id", &self.plan_id)
            .field("display_name", &self.display_name)
            .field("failure_policy", &self.failure_policy)
            .field("items", &self.nodes.len())
            .field("ordinal_groups", &self.groups.len())
            .finish()
    }
}
