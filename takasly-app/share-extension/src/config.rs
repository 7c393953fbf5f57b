use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::activation::ActivationAddress;
use crate::attachment::TypeIdentifier;
use crate::error::{Result, ShareError};
use crate::handoff::has_path_separator;

pub const DEFAULT_GROUP_IDENTIFIER: &str = "group.com.rivorya.takaslyapp";
pub const DEFAULT_RECORD_KEY: &str = "share_images";
pub const DEFAULT_ACTIVATION_URL: &str = "takasly://share";

/// Settings shared by the extension process and the host app.
///
/// Both sides must agree on the group identifier, the record key and the
/// activation URL, so these normally come from one checked-in file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionSettings {
    pub group_identifier: String,
    /// Directory under which group containers are resolved.
    pub container_root: PathBuf,
    pub record_key: String,
    pub activation_url: String,
    pub asset_prefix: String,
    pub asset_extension: String,
    pub supported_type: String,
}

impl Default for ExtensionSettings {
    fn default() -> Self {
        Self {
            group_identifier: DEFAULT_GROUP_IDENTIFIER.to_string(),
            container_root: default_container_root(),
            record_key: DEFAULT_RECORD_KEY.to_string(),
            activation_url: DEFAULT_ACTIVATION_URL.to_string(),
            asset_prefix: "shared_".to_string(),
            asset_extension: "jpg".to_string(),
            supported_type: TypeIdentifier::IMAGE.to_string(),
        }
    }
}

impl ExtensionSettings {
    pub fn validate(&self) -> Result<()> {
        if self.group_identifier.trim().is_empty() {
            return Err(ShareError::Config("group identifier is empty".into()));
        }
        if self.record_key.trim().is_empty() {
            return Err(ShareError::Config("record key is empty".into()));
        }
        if self.supported_type.trim().is_empty() {
            return Err(ShareError::Config("supported type is empty".into()));
        }
        if has_path_separator(&self.asset_extension) || has_path_separator(&self.asset_prefix) {
            return Err(ShareError::Config(
                "asset prefix and extension must not contain path separators".into(),
            ));
        }
        self.activation_address()?;
        Ok(())
    }

    pub fn activation_address(&self) -> Result<ActivationAddress> {
        self.activation_url.parse()
    }

    pub fn supported_type(&self) -> TypeIdentifier {
        TypeIdentifier::new(self.supported_type.clone())
    }
}

fn default_container_root() -> PathBuf {
    std::env::temp_dir().join("AppGroups")
}

pub fn load_settings(path: &Path) -> Result<ExtensionSettings> {
    if !path.exists() {
        return Ok(ExtensionSettings::default());
    }

    let content = std::fs::read_to_string(path)?;
    let settings: ExtensionSettings = serde_json::from_str(&content)?;
    Ok(settings)
}

pub fn save_settings(path: &Path, settings: &ExtensionSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content)?;
    Ok(())
}
