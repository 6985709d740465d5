use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::work_item::OrdinalGroupId;

/// An ordered partition of the plan's work items.
///
/// Counters are maintained with atomics rather than under the plan lock so
/// diagnostics and progress reporting can read them at any time. They are
/// only ever decremented, each exactly once per item.
#[derive(Debug)]
pub struct OrdinalGroup {
    id: OrdinalGroupId,
    not_started: AtomicUsize,
    not_finished: AtomicUsize,
}

impl OrdinalGroup {
    pub(crate) fn new(id: OrdinalGroupId, items: usize) -> Self {
        Self {
            id,
            not_started: AtomicUsize::new(items),
            not_finished: AtomicUsize::new(items),
        }
    }

    pub fn id(&self) -> OrdinalGroupId {
        self.id
    }

    /// Items not yet claimed by a worker or skipped
    pub fn not_started(&self) -> usize {
        self.not_started.load(Ordering::Acquire)
    }

    /// Items not yet in a terminal state
    pub fn not_finished(&self) -> usize {
        self.not_finished.load(Ordering::Acquire)
    }

    pub fn all_started(&self) -> bool {
        self.not_started() == 0
    }

    pub fn is_drained(&self) -> bool {
        self.not_finished() == 0
    }

    pub(crate) fn item_started(&self) {
        let previous = self.not_started.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "{} started more items than it holds", self.id);
    }

    pub(crate) fn item_finished(&self) {
        let previous = self.not_finished.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "{} finished more items than it holds", self.id);
    }
}

impl fmt::Display for OrdinalGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (not started: {}, not finished: {})",
            self.id,
            self.not_started(),
            self.not_finished()
        )
    }
}
