//! Waking the host app and releasing the extension once the hand-off is recorded.

pub mod activator;
pub mod address;
pub mod context;
pub mod host;

pub use activator::{Activator, HandoffOutcome};
pub use address::ActivationAddress;
pub use context::{CompletionSignal, ExtensionContext};
pub use host::{CommandActivator, HostActivator, UnavailableActivator};
