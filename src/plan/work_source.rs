use std::time::Duration;

use super::failure::PlanFailure;
use super::selection::{ExecutionState, Selection};
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::execution::WorkerPermit;

/// A source of work items of type `T`. Implementations must be thread safe.
///
/// Workers poll [`execution_state`](Self::execution_state), select items
/// while holding a [`WorkerPermit`], run them outside the source, and report
/// every selected item exactly once through
/// [`finished_executing`](Self::finished_executing).
pub trait WorkSource<T>: Send + Sync {
    /// Returns the current execution state of this source.
    ///
    /// The caller does not need to hold a worker permit. Implementations may
    /// return [`ExecutionState::MaybeWorkReadyToStart`] when unsure, to keep
    /// this call fast; they must never report `NoMoreWorkToStart` while work
    /// can still start.
    fn execution_state(&self) -> ExecutionState;

    /// Selects a work item to start.
    ///
    /// Returns [`Selection::NoWorkReadyToStart`] when items are queued but none
    /// is ready, and [`Selection::NoMoreWorkToStart`] when nothing remains to
    /// start. The permit ties the call to a held worker lease.
    fn select_next(&self, permit: &WorkerPermit) -> Selection<T>;

    /// Optional instrumentation point: the worker is about to run `item`.
    fn started_executing(&self, _item: &T) -> Result<()> {
        Ok(())
    }

    /// Reports the outcome of a previously selected item.
    ///
    /// Reporting an item twice, or one that was never selected, is a
    /// contract violation and returns an error.
    fn finished_executing(&self, item: &T, failure: Option<anyhow::Error>) -> Result<()>;

    /// Skips every item not yet started and records `cause` as a failure.
    fn abort_all_and_fail(&self, cause: anyhow::Error);

    /// Skips every item not yet started without recording a failure.
    fn cancel_execution(&self);

    /// True when there is no further work to start and no work in progress.
    fn all_execution_complete(&self) -> bool;

    /// Appends the current set of failures, in record order.
    fn collect_failures(&self, failures: &mut Vec<PlanFailure>);

    /// Best-effort description of the source for diagnosing a stuck build.
    fn health_diagnostics(&self) -> Diagnostics;

    /// Monotonic counter bumped on every state change that may unblock a worker.
    fn change_generation(&self) -> u64;

    /// Waits until the change generation moves past `observed`, or `timeout`
    /// elapses. Returns `true` if a change was observed.
    fn await_change(&self, observed: u64, timeout: Duration) -> bool;
}
