//! Key-value record shared with the host app.
//!
//! The extension is the only writer of the hand-off key and the host only reads
//! it after being activated, so activation itself orders the two processes and
//! no cross-process locking is involved. Each write replaces the whole value.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::error::{Result, ShareError};

pub trait KeyValueStore: Send + Sync {
    /// Replace the value stored under `key`.
    fn set_string_array(&self, key: &str, values: &[String]) -> Result<()>;

    fn string_array(&self, key: &str) -> Result<Option<Vec<String>>>;
}

/// Group-scoped defaults persisted as one JSON object per group.
///
/// Writes go to a temp file that is renamed over the original, so a reader
/// sees either the previous or the new document.
pub struct FileDefaults {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileDefaults {
    pub const FILE_SUFFIX: &'static str = ".defaults.json";

    /// Defaults for `group_identifier`, stored inside the group container directory.
    pub fn for_group(container_dir: &Path, group_identifier: &str) -> Self {
        Self::at(container_dir.join(format!("{}{}", group_identifier, Self::FILE_SUFFIX)))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = std::fs::read(&self.path)?;
        match serde_json::from_slice::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            other => Err(ShareError::Record(format!(
                "{} does not hold a JSON object (found {})",
                self.path.display(),
                json_kind(&other)
            ))),
        }
    }

    fn write_document(&self, document: &Map<String, Value>) -> Result<()> {
        let content = serde_json::to_vec_pretty(document)?;

        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut options = std::fs::OpenOptions::new();
            options.write(true).create(true).truncate(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(0o600);
            }
            let mut file = options.open(&temp_path)?;

            // `mode` only applies on creation; a leftover temp file keeps its old bits.
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
            }

            file.write_all(&content)?;
            file.sync_all()?;
        }
        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for FileDefaults {
    fn set_string_array(&self, key: &str, values: &[String]) -> Result<()> {
        let _guard = self.lock();
        let mut document = self.read_document().unwrap_or_else(|e| {
            warn!(
                "Replacing unreadable defaults document {}: {}",
                self.path.display(),
                e
            );
            Map::new()
        });
        document.insert(
            key.to_string(),
            Value::Array(values.iter().cloned().map(Value::String).collect()),
        );
        self.write_document(&document)
    }

    fn string_array(&self, key: &str) -> Result<Option<Vec<String>>> {
        let document = self.read_document()?;
        match document.get(key) {
            None => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value.clone()).map_err(|e| {
                ShareError::Record(format!("{} is not a string array: {}", key, e))
            })?)),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// In-process store, for tests and hosts that bring their own persistence.
#[derive(Default)]
pub struct MemoryDefaults {
    values: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<String>>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryDefaults {
    fn set_string_array(&self, key: &str, values: &[String]) -> Result<()> {
        self.lock().insert(key.to_string(), values.to_vec());
        Ok(())
    }

    fn string_array(&self, key: &str) -> Result<Option<Vec<String>>> {
        Ok(self.lock().get(key).cloned())
    }
}

/// The ordered list of persisted asset paths under the fixed hand-off key.
#[derive(Clone)]
pub struct HandoffRecord {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl HandoffRecord {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Replace the record with `paths`. Never appends to a previous value.
    pub fn overwrite(&self, paths: &[String]) -> Result<()> {
        self.store.set_string_array(&self.key, paths)?;
        debug!("Handoff record '{}' now holds {} paths", self.key, paths.len());
        Ok(())
    }

    /// Current contents; an absent key reads as an empty list.
    pub fn load(&self) -> Result<Vec<String>> {
        Ok(self.store.string_array(&self.key)?.unwrap_or_default())
    }
}
