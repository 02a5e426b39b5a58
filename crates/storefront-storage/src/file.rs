//! File-backed storage backend.

use crate::{KeyValueStore, StorageError, StorageResult};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Durable key-value store backed by a single JSON document.
///
/// The whole document is loaded at open and rewritten on every mutation.
/// Writes go to a sibling temp file first and are moved into place, so a
/// crash mid-write leaves the previous document intact.
pub struct JsonFileStore {
    path: PathBuf,
    cells: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Open a store at the given path.
    ///
    /// A missing file opens as an empty store. A malformed file also opens
    /// as an empty store (the content is a cache, not a source of truth).
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let cells = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Store file is malformed, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(StorageError::Io(e)),
        };
        Ok(Self {
            path,
            cells: Mutex::new(cells),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, cells: &HashMap<String, String>) -> StorageResult<()> {
        let json = serde_json::to_string(cells)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut cells = self.cells.lock().unwrap();
        cells.insert(key.to_string(), value.to_string());
        self.flush(&cells)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.cells.lock().unwrap().get(key).cloned())
    }

    fn remove(&self, key: &str) -> StorageResult<bool> {
        let mut cells = self.cells.lock().unwrap();
        let existed = cells.remove(key).is_some();
        if existed {
            self.flush(&cells)?;
        }
        Ok(existed)
    }
}
