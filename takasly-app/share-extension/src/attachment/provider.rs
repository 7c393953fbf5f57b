use std::path::PathBuf;

use async_trait::async_trait;

use super::TypeIdentifier;
use crate::error::{Result, ShareError};

/// What an attachment load produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedItem {
    /// A readable file on the local filesystem.
    File(PathBuf),
    /// Anything that is not a local content reference (inline objects, remote URLs).
    /// Not persisted.
    Other { description: String },
}

/// A typed reference to shared content that has not been materialised yet.
///
/// Implementations wrap whatever the share source hands over. Supporting a new
/// content kind means teaching a provider to report its identifier and yield a
/// [`LoadedItem::File`] for it.
#[async_trait]
pub trait ItemProvider: Send + Sync {
    fn registered_type_identifiers(&self) -> Vec<TypeIdentifier>;

    fn has_item_conforming_to(&self, type_identifier: &TypeIdentifier) -> bool {
        self.registered_type_identifiers()
            .iter()
            .any(|id| id.conforms_to(type_identifier))
    }

    async fn load_item(&self, type_identifier: &TypeIdentifier) -> Result<LoadedItem>;
}

/// Provider backed by a file that already exists locally.
#[derive(Debug, Clone)]
pub struct FileItemProvider {
    path: PathBuf,
    type_identifier: TypeIdentifier,
}

impl FileItemProvider {
    /// Infer the type identifier from the file extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let type_identifier = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(TypeIdentifier::from_extension)
            .unwrap_or_else(|| TypeIdentifier::new(TypeIdentifier::DATA));
        Self {
            path,
            type_identifier,
        }
    }

    pub fn with_type(path: impl Into<PathBuf>, type_identifier: TypeIdentifier) -> Self {
        Self {
            path: path.into(),
            type_identifier,
        }
    }
}

#[async_trait]
impl ItemProvider for FileItemProvider {
    fn registered_type_identifiers(&self) -> Vec<TypeIdentifier> {
        vec![self.type_identifier.clone()]
    }

    async fn load_item(&self, type_identifier: &TypeIdentifier) -> Result<LoadedItem> {
        if !self.type_identifier.conforms_to(type_identifier) {
            return Err(ShareError::UnsupportedContent(format!(
                "{} does not conform to {}",
                self.type_identifier, type_identifier
            )));
        }

        let metadata = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| ShareError::Load(format!("{}: {}", self.path.display(), e)))?;
        if !metadata.is_file() {
            return Err(ShareError::Load(format!(
                "{} is not a regular file",
                self.path.display()
            )));
        }

        Ok(LoadedItem::File(self.path.clone()))
    }
}
