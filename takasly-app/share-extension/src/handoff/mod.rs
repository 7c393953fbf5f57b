//! Hand-off storage shared with the host app: the group container holding
//! persisted assets, and the key-value record listing them.

pub mod container;
pub mod record;
pub mod store;

pub(crate) use container::has_path_separator;
pub use container::{AssetNaming, PersistedAsset, SharedContainer};
pub use record::{FileDefaults, HandoffRecord, KeyValueStore, MemoryDefaults};
pub use store::HandoffStore;
