//! The storage area shared by the extension process and the host app.
//!
//! Files are laid out flat under `<container root>/<group identifier>/` and named
//! `<prefix><uuid v4>.<extension>`, so concurrent writers never pick the same name.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, ShareError};

/// File name pattern for persisted assets.
#[derive(Debug, Clone)]
pub struct AssetNaming {
    pub prefix: String,
    pub extension: String,
}

impl AssetNaming {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    pub fn fresh_name(&self) -> String {
        let token = Uuid::new_v4().to_string().to_uppercase();
        if self.extension.is_empty() {
            format!("{}{}", self.prefix, token)
        } else {
            format!("{}{}.{}", self.prefix, token, self.extension)
        }
    }
}

/// One attachment materialised in the shared container. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedAsset {
    pub path: String,
    pub content_hash: String,
    pub byte_len: u64,
    pub persisted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SharedContainer {
    dir: PathBuf,
    naming: AssetNaming,
}

impl SharedContainer {
    /// Resolve (and create) the container for `group_identifier` under `container_root`.
    pub fn resolve(
        container_root: &Path,
        group_identifier: &str,
        naming: AssetNaming,
    ) -> Result<Self> {
        if group_identifier.is_empty()
            || has_path_separator(group_identifier)
            || group_identifier == "."
            || group_identifier == ".."
        {
            return Err(ShareError::Container(format!(
                "invalid group identifier: {:?}",
                group_identifier
            )));
        }

        let dir = container_root.join(group_identifier);
        if dir.to_str().is_none() {
            return Err(ShareError::Container(format!(
                "container path is not valid UTF-8: {}",
                dir.display()
            )));
        }

        std::fs::create_dir_all(&dir).map_err(|e| {
            ShareError::Container(format!("Could not create {}: {}", dir.display(), e))
        })?;

        Ok(Self { dir, naming })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `source` into the container under a freshly generated name.
    ///
    /// The destination is opened with `create_new`, so an existing file is never
    /// touched. A partially written file is removed before the error is returned.
    pub async fn materialize(&self, source: &Path) -> Result<PersistedAsset> {
        let bytes = tokio::fs::read(source)
            .await
            .map_err(|e| ShareError::Load(format!("{}: {}", source.display(), e)))?;

        let dest = self.dir.join(self.naming.fresh_name());
        if let Err(e) = write_new_file(&dest, &bytes).await {
            return Err(ShareError::Container(format!(
                "Failed to write {}: {}",
                dest.display(),
                e
            )));
        }

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let content_hash = hex::encode(hasher.finalize());

        let path = dest
            .to_str()
            .map(str::to_string)
            .ok_or_else(|| ShareError::Container("asset path is not valid UTF-8".into()))?;

        debug!(
            "Materialized {} ({} bytes, sha256 {})",
            path,
            bytes.len(),
            &content_hash[..8]
        );

        Ok(PersistedAsset {
            path,
            content_hash,
            byte_len: bytes.len() as u64,
            persisted_at: Utc::now(),
        })
    }
}

/// True if `s` would not stay a single path component on any supported platform.
pub(crate) fn has_path_separator(s: &str) -> bool {
    s.contains(|c: char| c == '/' || c == '\\')
}

async fn write_new_file(dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .await?;

    let written = async {
        file.write_all(bytes).await?;
        file.sync_all().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        let _ = tokio::fs::remove_file(dest).await;
        return Err(e);
    }
    Ok(())
}
