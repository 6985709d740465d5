//! # Plan Executor
//!
//! Drives a [`WorkSource`] to completion with a fixed set of worker threads.
//!
//! Each worker repeatedly polls the source, takes a [`WorkerPermit`] before
//! selecting, runs the selected item's action outside any plan lock, and
//! reports the outcome. Idle workers block on the source's change signal
//! instead of spinning. Panicking actions are reported as item failures.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use super::metrics::{ExecutorMetrics, WorkerMetrics};
use super::worker_lease::WorkerLeaseService;
use crate::config::{ExecutionConfig, PlanConfig};
use crate::constants::{events, system};
use crate::error::{PlanError, Result};
use crate::events::EventPublisher;
use crate::logging::{log_error, log_item_operation, log_plan_operation};
use crate::plan::{ExecutionPlan, ExecutionState, PlanFailure, Selection, WorkItem, WorkSource};

/// The work performed for each selected item.
///
/// Implemented for any `Fn(&I) -> anyhow::Result<()> + Sync` closure.
pub trait ItemAction<I>: Sync {
    fn run(&self, item: &I) -> anyhow::Result<()>;
}

impl<I, F> ItemAction<I> for F
where
    F: Fn(&I) -> anyhow::Result<()> + Sync,
{
    fn run(&self, item: &I) -> anyhow::Result<()> {
        self(item)
    }
}

/// Result of one executor run
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    pub display_name: String,
    pub failures: Vec<PlanFailure>,
    pub items_executed: u64,
    pub items_failed: u64,
    pub elapsed: Duration,
    pub worker_metrics: BTreeMap<String, WorkerMetrics>,
    pub cancelled: bool,
}

impl ExecutionSummary {
    /// No failures were recorded. A graceful cancel still counts as success;
    /// see [`ExecutionSummary::status`] for the distinction.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn status(&self) -> ExecutionStatus {
        if !self.failures.is_empty() {
            ExecutionStatus::Failed
        } else if self.cancelled {
            ExecutionStatus::Cancelled
        } else {
            ExecutionStatus::Succeeded
        }
    }
}

/// Overall outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Succeeded,
    Failed,
    Cancelled,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Fixed-size pool of worker threads pulling from a work source
#[derive(Debug, Clone)]
pub struct PlanExecutor {
    config: ExecutionConfig,
    publisher: Option<EventPublisher>,
}

impl PlanExecutor {
    pub fn new(config: ExecutionConfig) -> Self {
        Self {
            config,
            publisher: None,
        }
    }

    /// Build from a full configuration, with an event publisher sized by
    /// `diagnostics.event_channel_capacity`
    pub fn from_config(config: &PlanConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.execution.clone()).with_event_publisher(EventPublisher::new(
            config.diagnostics.event_channel_capacity,
        )))
    }

    pub fn with_event_publisher(mut self, publisher: EventPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn event_publisher(&self) -> Option<&EventPublisher> {
        self.publisher.as_ref()
    }

    /// Run every item of `plan` and return once all execution is complete
    pub fn run<T, A>(&self, plan: &ExecutionPlan<T>, action: &A) -> Result<ExecutionSummary>
    where
        T: Send + Sync,
        A: ItemAction<WorkItem<T>>,
    {
        let mut summary = self.execute::<WorkItem<T>, _, _>(plan.display_name(), plan, action)?;
        summary.cancelled = plan.is_cancelled();

        if plan.is_aborted() {
            self.publish(events::PLAN_ABORTED, json!({ "plan": plan.display_name() }));
        } else if summary.cancelled {
            self.publish(events::PLAN_CANCELLED, json!({ "plan": plan.display_name() }));
        }
        Ok(summary)
    }

    /// Drive any work source until it reports all execution complete
    #[instrument(skip(self, source, action), fields(workers = self.config.worker_threads))]
    pub fn execute<I, S, A>(&self, display_name: &str, source: &S, action: &A) -> Result<ExecutionSummary>
    where
        I: fmt::Display,
        S: WorkSource<I>,
        A: ItemAction<I>,
    {
        let started = Instant::now();
        let leases = WorkerLeaseService::new(self.config.max_concurrent_items);
        let metrics = ExecutorMetrics::new();
        let worker_count = self.config.worker_threads.max(1);

        log_plan_operation(
            "execute",
            display_name,
            "started",
            Some(&format!(
                "workers={worker_count} permits={}",
                leases.max_permits()
            )),
        );
        self.publish(
            events::PLAN_STARTED,
            json!({ "plan": display_name, "workers": worker_count }),
        );

        let scope_result = crossbeam::thread::scope(|scope| {
            let mut spawned = 0usize;
            for index in 0..worker_count {
                let worker = format!("{}-{index}", system::WORKER_THREAD_PREFIX);
                metrics.register_worker(&worker);
                let context = WorkerContext {
                    name: worker.clone(),
                    plan: display_name,
                    source,
                    action,
                    leases: leases.clone(),
                    metrics: &metrics,
                };
                match scope
                    .builder()
                    .name(worker.clone())
                    .spawn(move |_| self.run_worker::<I, S, A>(context))
                {
                    Ok(_) => spawned += 1,
                    Err(err) => log_error(
                        "executor",
                        "spawn_worker",
                        &err.to_string(),
                        Some(&worker),
                    ),
                }
            }
            if spawned == 0 {
                source.abort_all_and_fail(anyhow::anyhow!("no worker thread could be started"));
            }
            spawned
        });

        let spawned = match scope_result {
            Ok(spawned) => spawned,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log_error("executor", "execute", &message, Some(display_name));
                source.abort_all_and_fail(anyhow::anyhow!("worker thread panicked: {message}"));
                return Err(PlanError::WorkerError(format!(
                    "worker thread panicked: {message}"
                )));
            }
        };
        if spawned == 0 {
            return Err(PlanError::WorkerError(
                "no worker thread could be started".to_string(),
            ));
        }

        let mut failures = Vec::new();
        source.collect_failures(&mut failures);
        let totals = metrics.totals();
        let summary = ExecutionSummary {
            display_name: display_name.to_string(),
            failures,
            items_executed: totals.items_executed,
            items_failed: totals.items_failed,
            elapsed: started.elapsed(),
            worker_metrics: metrics.snapshot(),
            cancelled: false,
        };

        let status = if summary.failures.is_empty() {
            "completed"
        } else {
            "failed"
        };
        log_plan_operation(
            "execute",
            display_name,
            status,
            Some(&format!(
                "executed={} failed={} failures={} elapsed_ms={}",
                summary.items_executed,
                summary.items_failed,
                summary.failures.len(),
                summary.elapsed.as_millis()
            )),
        );
        self.publish(
            events::PLAN_COMPLETED,
            json!({
                "plan": display_name,
                "status": status,
                "items_executed": summary.items_executed,
                "failures": summary.failures.iter().map(ToString::to_string).collect::<Vec<_>>(),
            }),
        );
        Ok(summary)
    }

    fn run_worker<I, S, A>(&self, context: WorkerContext<'_, S, A>)
    where
        I: fmt::Display,
        S: WorkSource<I>,
        A: ItemAction<I>,
    {
        let worker = context.name.as_str();
        debug!(worker = worker, "Worker started");
        self.publish(events::WORKER_STARTED, json!({ "worker": worker }));

        let mut last_progress = Instant::now();
        let mut last_generation = context.source.change_generation();
        loop {
            // Capture before polling so a change racing with the poll still wakes us
            let observed = context.source.change_generation();
            if observed != last_generation {
                last_generation = observed;
                last_progress = Instant::now();
            }

            match context.source.execution_state() {
                ExecutionState::NoMoreWorkToStart => break,
                ExecutionState::NoWorkReadyToStart => {
                    self.idle::<I, S, A>(&context, observed, &mut last_progress);
                    continue;
                }
                ExecutionState::MaybeWorkReadyToStart => {}
            }

            let permit = context.leases.acquire();
            match context.source.select_next(&permit) {
                Selection::Item(item) => {
                    self.execute_item(&context, &item);
                    drop(permit);
                }
                Selection::NoWorkReadyToStart => {
                    drop(permit);
                    self.idle::<I, S, A>(&context, observed, &mut last_progress);
                }
                Selection::NoMoreWorkToStart => break,
            }
        }

        debug!(worker = worker, "Worker stopped");
        self.publish(events::WORKER_STOPPED, json!({ "worker": worker }));
    }

    fn execute_item<I, S, A>(&self, context: &WorkerContext<'_, S, A>, item: &I)
    where
        I: fmt::Display,
        S: WorkSource<I>,
        A: ItemAction<I>,
    {
        let worker = context.name.as_str();
        let name = item.to_string();
        self.publish(
            events::ITEM_SELECTED,
            json!({ "plan": context.plan, "item": name, "worker": worker }),
        );

        let started = Instant::now();
        let failure = match context.source.started_executing(item) {
            Ok(()) => match panic::catch_unwind(AssertUnwindSafe(|| context.action.run(item))) {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(err),
                Err(payload) => Some(anyhow::anyhow!(
                    "action panicked: {}",
                    panic_message(payload.as_ref())
                )),
            },
            Err(err) => Some(anyhow::Error::new(err)),
        };
        let elapsed = started.elapsed();
        context
            .metrics
            .record_execution(worker, elapsed, failure.is_some());

        match &failure {
            None => {
                log_item_operation("execute", context.plan, &name, "succeeded", None);
                self.publish(
                    events::ITEM_SUCCEEDED,
                    json!({ "plan": context.plan, "item": name, "duration_ms": elapsed.as_millis() as u64 }),
                );
            }
            Some(err) => {
                let details = format!("{err:#}");
                log_item_operation("execute", context.plan, &name, "failed", Some(&details));
                self.publish(
                    events::ITEM_FAILED,
                    json!({ "plan": context.plan, "item": name, "error": details }),
                );
            }
        }

        if let Err(err) = context.source.finished_executing(item, failure) {
            log_error("executor", "finished_executing", &err.to_string(), Some(&name));
            context.source.abort_all_and_fail(anyhow::Error::new(err));
        }
    }

    fn idle<I, S, A>(&self, context: &WorkerContext<'_, S, A>, observed: u64, last_progress: &mut Instant)
    where
        S: WorkSource<I>,
    {
        context.metrics.record_idle_wait(&context.name);
        if context.source.await_change(observed, self.config.idle_wait()) {
            *last_progress = Instant::now();
            return;
        }
        if last_progress.elapsed() >= self.config.stall_warning_after() {
            warn!(
                worker = %context.name,
                plan = context.plan,
                idle_ms = last_progress.elapsed().as_millis() as u64,
                diagnostics = %context.source.health_diagnostics(),
                "No progress while waiting for work"
            );
            context.metrics.record_stall_warning(&context.name);
            *last_progress = Instant::now();
        }
    }

    fn publish(&self, name: &str, context: serde_json::Value) {
        if let Some(publisher) = &self.publisher {
            if let Err(err) = publisher.publish(name, context) {
                debug!(event = name, error = %err, "Dropped progress event");
            }
        }
    }
}

impl Default for PlanExecutor {
    fn default() -> Self {
        Self::new(ExecutionConfig::default())
    }
}

struct WorkerContext<'a, S, A> {
    name: String,
    plan: &'a str,
    source: &'a S,
    action: &'a A,
    leases: WorkerLeaseService,
    metrics: &'a ExecutorMetrics,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::ExecutionPlanBuilder;
    use parking_lot::Mutex;

    fn executor(workers: usize) -> PlanExecutor {
        PlanExecutor::new(ExecutionConfig {
            worker_threads: workers,
            max_concurrent_items: workers,
            idle_wait_ms: 10,
            ..ExecutionConfig::default()
        })
    }

    #[test]
    fn test_runs_chain_in_order() {
        let mut builder = ExecutionPlanBuilder::new("chain");
        let group = builder.ordinal_group();
        let a = builder.add_item(group, ":a", ());
        let b = builder.add_item(group, ":b", ());
        let c = builder.add_item(group, ":c", ());
        builder.add_dependency(b, a).add_dependency(c, b);
        let plan = builder.build().unwrap();

        let order = Mutex::new(Vec::new());
        let action = |item: &WorkItem<()>| -> anyhow::Result<()> {
            order.lock().push(item.name().to_string());
            Ok(())
        };
        let summary = executor(3).run(&plan, &action).unwrap();

        assert!(summary.is_success());
        assert_eq!(summary.status(), ExecutionStatus::Succeeded);
        assert_eq!(summary.items_executed, 3);
        assert_eq!(*order.lock(), [":a", ":b", ":c"]);
        assert_eq!(summary.worker_metrics.len(), 3);
    }

    #[test]
    fn test_panicking_action_becomes_failure() {
        let mut builder = ExecutionPlanBuilder::new("panics");
        let group = builder.ordinal_group();
        builder.add_item(group, ":boom", ());
        let plan = builder.build().unwrap();

        let action = |_: &WorkItem<()>| -> anyhow::Result<()> { panic!("kaboom") };
        let summary = executor(1).run(&plan, &action).unwrap();

        assert_eq!(summary.status(), ExecutionStatus::Failed);
        assert_eq!(summary.items_failed, 1);
        assert_eq!(
            summary.failures[0].to_string(),
            "Execution failed for :boom: action panicked: kaboom"
        );
    }

    #[test]
    fn test_events_published() {
        let mut builder = ExecutionPlanBuilder::new("events");
        let group = builder.ordinal_group();
        builder.add_item(group, ":a", ());
        let plan = builder.build().unwrap();

        let publisher = EventPublisher::new(64);
        let receiver = publisher.subscribe();
        let action = |_: &WorkItem<()>| -> anyhow::Result<()> { Ok(()) };
        executor(1)
            .with_event_publisher(publisher)
            .run(&plan, &action)
            .unwrap();

        let names: Vec<String> = receiver.try_iter().map(|event| event.name).collect();
        assert_eq!(names.first().map(String::as_str), Some(events::PLAN_STARTED));
        assert_eq!(names.last().map(String::as_str), Some(events::PLAN_COMPLETED));
        assert!(names.iter().any(|name| name == events::ITEM_SELECTED));
        assert!(names.iter().any(|name| name == events::ITEM_SUCCEEDED));
        assert!(names.iter().any(|name| name == events::WORKER_STOPPED));
    }

    #[test]
    fn test_idle_worker_records_stall_warning() {
        let mut builder = ExecutionPlanBuilder::new("stall");
        let group = builder.ordinal_group();
        let slow = builder.add_item(group, ":slow", ());
        let next = builder.add_item(group, ":next", ());
        builder.add_dependency(next, slow);
        let plan = builder.build().unwrap();

        let action = |item: &WorkItem<()>| -> anyhow::Result<()> {
            if item.name() == ":slow" {
                std::thread::sleep(Duration::from_millis(150));
            }
            Ok(())
        };
        let summary = PlanExecutor::new(ExecutionConfig {
            worker_threads: 2,
            max_concurrent_items: 2,
            idle_wait_ms: 5,
            stall_warning_after_ms: 20,
            ..ExecutionConfig::default()
        })
        .run(&plan, &action)
        .unwrap();

        assert!(summary.is_success());
        let stalls: u64 = summary
            .worker_metrics
            .values()
            .map(|metrics| metrics.stall_warnings)
            .sum();
        assert!(stalls >= 1);
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = PlanConfig::default();
        config.execution.worker_threads = 0;
        assert!(matches!(
            PlanExecutor::from_config(&config),
            Err(PlanError::ConfigurationError(_))
        ));
    }
}
