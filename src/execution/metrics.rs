use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Counters for a single worker thread
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerMetrics {
    pub items_executed: u64,
    pub items_failed: u64,
    pub busy_time_ms: u64,
    /// Times the worker had to wait for the plan to change
    pub idle_waits: u64,
    pub stall_warnings: u64,
}

impl WorkerMetrics {
    fn absorb(&mut self, other: &WorkerMetrics) {
        self.items_executed += other.items_executed;
        self.items_failed += other.items_failed;
        self.busy_time_ms += other.busy_time_ms;
        self.idle_waits += other.idle_waits;
        self.stall_warnings += other.stall_warnings;
    }
}

/// Per-worker metrics shared by the threads of one executor run
#[derive(Debug, Clone, Default)]
pub struct ExecutorMetrics {
    workers: Arc<DashMap<String, WorkerMetrics>>,
}

impl ExecutorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_worker(&self, worker: &str) {
        self.workers.entry(worker.to_string()).or_default();
    }

    pub fn record_execution(&self, worker: &str, elapsed: Duration, failed: bool) {
        let mut metrics = self.workers.entry(worker.to_string()).or_default();
        metrics.items_executed += 1;
        if failed {
            metrics.items_failed += 1;
        }
        metrics.busy_time_ms += elapsed.as_millis() as u64;
    }

    pub fn record_idle_wait(&self, worker: &str) {
        self.workers.entry(worker.to_string()).or_default().idle_waits += 1;
    }

    pub fn record_stall_warning(&self, worker: &str) {
        self.workers.entry(worker.to_string()).or_default().stall_warnings += 1;
    }

    pub fn worker(&self, worker: &str) -> Option<WorkerMetrics> {
        self.workers.get(worker).map(|metrics| metrics.clone())
    }

    /// Copy of every worker's counters, ordered by worker name
    pub fn snapshot(&self) -> BTreeMap<String, WorkerMetrics> {
        self.workers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn totals(&self) -> WorkerMetrics {
        let mut totals = WorkerMetrics::default();
        for entry in self.workers.iter() {
            totals.absorb(entry.value());
        }
        totals
    }
}
