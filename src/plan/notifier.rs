use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Broadcast "something changed" signal for idle workers.
///
/// Waiters capture the generation *before* polling the plan and then wait for
/// it to move past that value, so a change that lands between the poll and
/// the wait is never missed.
#[derive(Debug, Default)]
pub(crate) struct ChangeNotifier {
    generation: Mutex<u64>,
    changed: Condvar,
}

impl ChangeNotifier {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    /// Bump the generation and wake every waiter
    pub(crate) fn notify_all(&self) {
        let mut generation = self.generation.lock();
        *generation = generation.wrapping_add(1);
        self.changed.notify_all();
    }

    /// Block until the generation differs from `observed` or `timeout` elapses.
    /// Returns `true` when a change was seen.
    pub(crate) fn await_change(&self, observed: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut generation = self.generation.lock();
        while *generation == observed {
            if self.changed.wait_until(&mut generation, deadline).timed_out() {
                return *generation != observed;
            }
        }
        true
    }
}
