use std::sync::Mutex;

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, ShareError};

/// Lifecycle of a single share hand-off.
///
/// Transitions only move forward: `Idle -> Collecting -> Finalizing ->
/// Terminated`. `Terminated` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HandoffPhase {
    Idle,
    Collecting,
    Finalizing,
    Terminated,
}

impl HandoffPhase {
    fn can_advance_to(self, next: HandoffPhase) -> bool {
        matches!(
            (self, next),
            (HandoffPhase::Idle, HandoffPhase::Collecting)
                | (HandoffPhase::Collecting, HandoffPhase::Finalizing)
                | (HandoffPhase::Finalizing, HandoffPhase::Terminated)
        )
    }
}

pub struct PhaseTracker {
    phase: Mutex<HandoffPhase>,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(HandoffPhase::Idle),
        }
    }

    pub fn current(&self) -> HandoffPhase {
        *self.lock()
    }

    pub fn advance(&self, next: HandoffPhase) -> Result<()> {
        let mut phase = self.lock();
        if !phase.can_advance_to(next) {
            return Err(ShareError::InvalidTransition {
                from: *phase,
                to: next,
            });
        }
        debug!("Handoff phase {:?} -> {:?}", *phase, next);
        *phase = next;
        Ok(())
    }

    // The guarded value is a Copy enum, so a poisoned lock still holds a valid phase.
    fn lock(&self) -> std::sync::MutexGuard<'_, HandoffPhase> {
        self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}
