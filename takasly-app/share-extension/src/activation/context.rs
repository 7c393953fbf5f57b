use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;
use tracing::info;

/// The OS-side lifecycle of the extension. `complete_request` tells the host OS
/// the extension is done and may be torn down.
pub trait ExtensionContext: Send + Sync {
    fn complete_request(&self);
}

/// Context that records completion so a process shell can wait for it and exit.
#[derive(Default)]
pub struct CompletionSignal {
    completions: AtomicUsize,
    notify: Notify,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        self.completion_count() > 0
    }

    pub fn completion_count(&self) -> usize {
        self.completions.load(Ordering::Acquire)
    }

    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_complete() {
                return;
            }
            notified.await;
        }
    }
}

impl ExtensionContext for CompletionSignal {
    fn complete_request(&self) {
        self.completions.fetch_add(1, Ordering::AcqRel);
        info!("Extension request completed");
        self.notify.notify_waiters();
    }
}
