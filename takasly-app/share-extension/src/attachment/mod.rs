pub mod collector;
pub mod provider;
pub mod types;

pub use collector::AttachmentCollector;
pub use provider::{FileItemProvider, ItemProvider, LoadedItem};
pub use types::TypeIdentifier;
