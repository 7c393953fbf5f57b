//! Hand-off from the share extension process to the Takasly host app.
//!
//! The extension receives a [`ShareRequest`], copies every supported attachment
//! into the storage area shared with the host app, lists the copies in a shared
//! key-value record and, once every load has resolved, wakes the host app
//! through its activation URL before tearing itself down.

pub mod activation;
pub mod attachment;
pub mod barrier;
pub mod config;
pub mod error;
pub mod extension;
pub mod handoff;
pub mod request;
pub mod state;

pub use activation::{
    ActivationAddress, CommandActivator, CompletionSignal, ExtensionContext, HandoffOutcome,
    HostActivator, UnavailableActivator,
};
pub use attachment::{FileItemProvider, ItemProvider, LoadedItem, TypeIdentifier};
pub use config::{load_settings, save_settings, ExtensionSettings};
pub use error::{Result, ShareError};
pub use extension::{shared_record, PendingHandoff, ShareExtension};
pub use handoff::{FileDefaults, HandoffRecord, KeyValueStore, MemoryDefaults, PersistedAsset};
pub use request::{Attachment, InputItem, ShareRequest};
pub use state::HandoffPhase;
