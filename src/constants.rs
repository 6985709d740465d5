//! # System Constants
//!
//! Event names and operational defaults shared by the plan, the executor and
//! the configuration layer.

/// Lifecycle events published while a plan executes
pub mod events {
    // Work item lifecycle events
    pub const ITEM_SELECTED: &str = "item.selected";
    pub const ITEM_SUCCEEDED: &str = "item.succeeded";
    pub const ITEM_FAILED: &str = "item.failed";

    // Plan lifecycle events
    pub const PLAN_STARTED: &str = "plan.started";
    pub const PLAN_COMPLETED: &str = "plan.completed";
    pub const PLAN_CANCELLED: &str = "plan.cancelled";
    pub const PLAN_ABORTED: &str = "plan.aborted";

    // Worker lifecycle events
    pub const WORKER_STARTED: &str = "worker.started";
    pub const WORKER_STOPPED: &str = "worker.stopped";
}

/// Operational defaults
pub mod system {
    /// Used when the platform cannot report its parallelism
    pub const FALLBACK_WORKER_THREADS: usize = 4;
    pub const DEFAULT_IDLE_WAIT_MS: u64 = 100;
    pub const DEFAULT_STALL_WARNING_AFTER_MS: u64 = 30_000;
    pub const DEFAULT_MAX_DIAGNOSTIC_ITEMS: usize = 100;
    pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;

    pub const CONFIG_DIRECTORY: &str = "config";
    pub const CONFIG_FILE_STEM: &str = "tasker-plan";
    pub const CONFIG_ENV_PREFIX: &str = "TASKER_PLAN";

    /// Prefix for worker thread names
    pub const WORKER_THREAD_PREFIX: &str = "plan-worker";
}
