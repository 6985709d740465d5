//! # Plan Execution
//!
//! Worker threads, permits and per-worker metrics for driving a
//! [`WorkSource`](crate::plan::WorkSource).

pub mod executor;
pub mod metrics;
pub mod worker_lease;

pub use executor::{ExecutionStatus, ExecutionSummary, ItemAction, PlanExecutor};
pub use metrics::{ExecutorMetrics, WorkerMetrics};
pub use worker_lease::{WorkerLeaseService, WorkerPermit};
