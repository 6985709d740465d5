//! # Execution Plan Configuration
//!
//! Typed configuration for the plan executor and diagnostics, loaded in layers
//! by [`ConfigManager`]: built-in defaults, a `tasker-plan.toml` file, an
//! environment-specific override file and `TASKER_PLAN__*` variables.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tasker_plan::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let workers = manager.config().execution.worker_threads;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::system;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring tasker-plan.toml
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Worker pool and failure handling
    pub execution: ExecutionConfig,

    /// Health diagnostics and progress events
    pub diagnostics: DiagnosticsConfig,
}

/// How the plan reacts to a failed work item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop starting new work after the first failure
    #[default]
    FailFast,
    /// Keep running everything not downstream of a failure
    ContinueOnFailure,
}

impl FailurePolicy {
    pub fn continues_on_failure(&self) -> bool {
        matches!(self, Self::ContinueOnFailure)
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Number of polling worker threads
    pub worker_threads: usize,
    /// Worker permits: upper bound on concurrently executing items
    pub max_concurrent_items: usize,
    pub failure_policy: FailurePolicy,
    /// Longest a worker sleeps between polls when nothing is ready
    pub idle_wait_ms: u64,
    /// Idle time without any plan change before a worker logs diagnostics
    pub stall_warning_after_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(system::FALLBACK_WORKER_THREADS);
        Self {
            worker_threads: parallelism,
            max_concurrent_items: parallelism,
            failure_policy: FailurePolicy::default(),
            idle_wait_ms: system::DEFAULT_IDLE_WAIT_MS,
            stall_warning_after_ms: system::DEFAULT_STALL_WARNING_AFTER_MS,
        }
    }
}

impl ExecutionConfig {
    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }

    pub fn stall_warning_after(&self) -> Duration {
        Duration::from_millis(self.stall_warning_after_ms)
    }
}

/// Diagnostics and event configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Maximum item names listed per section of a health snapshot (0 = unlimited)
    pub max_items_listed: usize,
    /// Bound of the progress event channel
    pub event_channel_capacity: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            max_items_listed: system::DEFAULT_MAX_DIAGNOSTIC_ITEMS,
            event_channel_capacity: system::DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl PlanConfig {
    /// Reject configurations the executor cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        let execution = &self.execution;
        if execution.worker_threads == 0 {
            return Err(ConfigurationError::invalid_value(
                "execution.worker_threads",
                execution.worker_threads,
                "at least one worker thread is required",
            ));
        }
        if execution.max_concurrent_items == 0 {
            return Err(ConfigurationError::invalid_value(
                "execution.max_concurrent_items",
                execution.max_concurrent_items,
                "at least one worker permit is required",
            ));
        }
        if execution.idle_wait_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "execution.idle_wait_ms",
                execution.idle_wait_ms,
                "idle wait must be positive",
            ));
        }
        if self.diagnostics.event_channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "diagnostics.event_channel_capacity",
                self.diagnostics.event_channel_capacity,
                "event channel needs room for at least one event",
            ));
        }
        Ok(())
    }
}
