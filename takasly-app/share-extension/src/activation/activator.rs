use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::{ActivationAddress, ExtensionContext, HostActivator};
use crate::error::Result;
use crate::handoff::HandoffStore;
use crate::state::{HandoffPhase, PhaseTracker};

/// Summary of one finished hand-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandoffOutcome {
    /// Loads started by the collector.
    pub issued: usize,
    /// Paths the record holds for the host, in the order they were persisted.
    /// Empty when the final record write failed.
    pub persisted: Vec<String>,
    /// Whether the final record write succeeded.
    pub recorded: bool,
    /// Whether the host activator reported success.
    pub activated: bool,
}

/// Owns the hand-off lifecycle and performs the final record flush,
/// host activation and extension teardown, in that order.
pub struct Activator {
    address: ActivationAddress,
    host: Arc<dyn HostActivator>,
    context: Arc<dyn ExtensionContext>,
    phase: PhaseTracker,
}

impl Activator {
    pub fn new(
        address: ActivationAddress,
        host: Arc<dyn HostActivator>,
        context: Arc<dyn ExtensionContext>,
    ) -> Self {
        Self {
            address,
            host,
            context,
            phase: PhaseTracker::new(),
        }
    }

    pub fn phase(&self) -> HandoffPhase {
        self.phase.current()
    }

    pub fn begin_collecting(&self) -> Result<()> {
        self.phase.advance(HandoffPhase::Collecting)
    }

    /// Runs once after every issued load has resolved. A second call fails
    /// with an invalid transition and does nothing.
    ///
    /// Activation and record failures are logged, never returned: the host
    /// sees whatever the record holds, and the extension is always torn down.
    pub async fn finalize(&self, store: &HandoffStore, issued: usize) -> Result<HandoffOutcome> {
        self.phase.advance(HandoffPhase::Finalizing)?;

        let (persisted, recorded) = match store.flush().await {
            Ok(paths) => (paths, true),
            Err(e) => {
                warn!(
                    "Final handoff record write failed, {} persisted assets are not listed: {}",
                    store.persisted().await.len(),
                    e
                );
                (Vec::new(), false)
            }
        };

        let activated = match self.host.open(&self.address).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not activate host app via {}: {}", self.address, e);
                false
            }
        };

        self.context.complete_request();
        self.phase.advance(HandoffPhase::Terminated)?;

        info!(
            "Handoff finished: {}/{} attachments recorded, host activated: {}",
            persisted.len(),
            issued,
            activated
        );

        Ok(HandoffOutcome {
            issued,
            persisted,
            recorded,
            activated,
        })
    }
}
