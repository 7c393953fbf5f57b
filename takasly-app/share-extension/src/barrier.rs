//! Join barrier over asynchronously completing attachment loads.
//!
//! Each issued load holds a [`LoadGuard`]; dropping the guard is the single
//! completion signal for that load, whatever its result. [`LoadBarrier::wait_idle`]
//! resolves once no guard is alive.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::debug;

pub struct LoadBarrier {
    outstanding: AtomicUsize,
    idle_notify: Notify,
}

impl LoadBarrier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            outstanding: AtomicUsize::new(0),
            idle_notify: Notify::new(),
        })
    }

    /// Register one outstanding operation.
    pub fn enter(self: &Arc<Self>) -> LoadGuard {
        let now = self.outstanding.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("Load barrier entered (outstanding: {})", now);
        LoadGuard {
            barrier: Arc::clone(self),
        }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Wait until every guard handed out so far has been dropped.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle_notify.notified();
            tokio::pin!(notified);
            // Register before checking so a leave between the check and the await is not lost.
            notified.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn leave(&self) {
        let previous = self.outstanding.fetch_sub(1, Ordering::AcqRel);
        debug!("Load barrier left (outstanding: {})", previous - 1);
        if previous == 1 {
            self.idle_notify.notify_waiters();
        }
    }
}

/// Completion token for one outstanding load. Leaves the barrier exactly once, on drop.
#[must_use = "dropping the guard immediately marks the load as complete"]
pub struct LoadGuard {
    barrier: Arc<LoadBarrier>,
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        self.barrier.leave();
    }
}
