//! # Worker Leases
//!
//! A bounded pool of permits. A worker must hold a [`WorkerPermit`] to select
//! and run a work item, which caps the number of concurrently executing items
//! independently of how many threads are polling the plan.

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

/// Counting permit service shared by all workers of an executor
#[derive(Clone)]
pub struct WorkerLeaseService {
    inner: Arc<LeaseInner>,
}

struct LeaseInner {
    max_permits: usize,
    in_use: Mutex<usize>,
    released: Condvar,
    next_lease_id: AtomicU64,
}

impl WorkerLeaseService {
    /// Create a service handing out at most `max_permits` permits (minimum 1)
    pub fn new(max_permits: usize) -> Self {
        Self {
            inner: Arc::new(LeaseInner {
                max_permits: max_permits.max(1),
                in_use: Mutex::new(0),
                released: Condvar::new(),
                next_lease_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn max_permits(&self) -> usize {
        self.inner.max_permits
    }

    pub fn permits_in_use(&self) -> usize {
        *self.inner.in_use.lock()
    }

    pub fn available_permits(&self) -> usize {
        self.inner.max_permits - self.permits_in_use()
    }

    /// Block until a permit is available
    pub fn acquire(&self) -> WorkerPermit {
        let mut in_use = self.inner.in_use.lock();
        while *in_use >= self.inner.max_permits {
            self.inner.released.wait(&mut in_use);
        }
        *in_use += 1;
        self.issue()
    }

    /// Take a permit only if one is free right now
    pub fn try_acquire(&self) -> Option<WorkerPermit> {
        let mut in_use = self.inner.in_use.lock();
        if *in_use >= self.inner.max_permits {
            return None;
        }
        *in_use += 1;
        Some(self.issue())
    }

    /// Block for at most `timeout` waiting for a permit
    pub fn acquire_timeout(&self, timeout: Duration) -> Option<WorkerPermit> {
        let deadline = Instant::now() + timeout;
        let mut in_use = self.inner.in_use.lock();
        while *in_use >= self.inner.max_permits {
            if self
                .inner
                .released
                .wait_until(&mut in_use, deadline)
                .timed_out()
                && *in_use >= self.inner.max_permits
            {
                return None;
            }
        }
        *in_use += 1;
        Some(self.issue())
    }

    /// Give a permit back. Equivalent to dropping it.
    pub fn release(&self, permit: WorkerPermit) {
        drop(permit);
    }

    fn issue(&self) -> WorkerPermit {
        let lease_id = self.inner.next_lease_id.fetch_add(1, Ordering::Relaxed);
        trace!(lease_id = lease_id, "Worker permit acquired");
        WorkerPermit {
            inner: Arc::clone(&self.inner),
            lease_id,
        }
    }
}

impl fmt::Debug for WorkerLeaseService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerLeaseService")
            .field("max_permits", &self.inner.max_permits)
            .field("in_use", &self.permits_in_use())
            .finish()
    }
}

/// Proof that the holder may select and execute one work item.
/// Released when dropped.
pub struct WorkerPermit {
    inner: Arc<LeaseInner>,
    lease_id: u64,
}

impl WorkerPermit {
    pub fn lease_id(&self) -> u64 {
        self.lease_id
    }
}

impl Drop for WorkerPermit {
    fn drop(&mut self) {
        let mut in_use = self.inner.in_use.lock();
        *in_use = in_use.saturating_sub(1);
        self.inner.released.notify_one();
        trace!(lease_id = self.lease_id, "Worker permit released");
    }
}

impl fmt::Debug for WorkerPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPermit")
            .field("lease_id", &self.lease_id)
            .finish()
    }
}
