use std::path::Path;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::container::{PersistedAsset, SharedContainer};
use super::record::HandoffRecord;
use crate::error::Result;

/// Persists loaded attachments into the shared container and keeps the
/// hand-off record in step with them.
pub struct HandoffStore {
    container: SharedContainer,
    record: HandoffRecord,
    assets: Mutex<Vec<PersistedAsset>>,
}

impl HandoffStore {
    pub fn new(container: SharedContainer, record: HandoffRecord) -> Self {
        Self {
            container,
            record,
            assets: Mutex::new(Vec::new()),
        }
    }

    /// Copy `source` into the container and append it to the record.
    ///
    /// Failures are logged and the attachment is dropped. The record is
    /// rewritten in full while the asset list is locked, so the last write
    /// always carries every asset persisted so far.
    pub async fn persist(&self, source: &Path) -> Option<PersistedAsset> {
        let asset = match self.container.materialize(source).await {
            Ok(asset) => asset,
            Err(e) => {
                warn!("Dropping attachment {}: {}", source.display(), e);
                return None;
            }
        };

        let mut assets = self.assets.lock().await;
        assets.push(asset.clone());
        if let Err(e) = self.record.overwrite(&asset_paths(&assets)) {
            // `flush` retries the full write before activation.
            warn!("Failed to update handoff record: {}", e);
        }
        debug!(
            "Persisted {} at {} ({} total)",
            asset.path,
            asset.persisted_at.to_rfc3339(),
            assets.len()
        );

        Some(asset)
    }

    /// Write the complete ordered list to the record, empty if nothing was persisted.
    pub async fn flush(&self) -> Result<Vec<String>> {
        let assets = self.assets.lock().await;
        let paths = asset_paths(&assets);
        self.record.overwrite(&paths)?;
        Ok(paths)
    }

    pub async fn persisted(&self) -> Vec<PersistedAsset> {
        self.assets.lock().await.clone()
    }
}

fn asset_paths(assets: &[PersistedAsset]) -> Vec<String> {
    assets.iter().map(|a| a.path.clone()).collect()
}
