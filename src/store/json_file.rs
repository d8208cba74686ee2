// File-backed key-value store: one JSON object per namespace
// Writes use the temp file + fsync + rename pattern so a crash mid-write
// leaves either the old or the new document on disk, never a torn one.

use super::{apply_to_map, KeyValueStore, StoreError, WriteBatch};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Key-value store persisted as `<dir>/<namespace>.json`
#[derive(Debug)]
pub struct JsonFileStore {
    /// Current contents, mirrored from disk after every successful write
    entries: Mutex<BTreeMap<String, String>>,
    /// Path to persistence file
    file_path: PathBuf,
}

impl JsonFileStore {
    /// Open (or lazily create) the store for `namespace` inside `dir`.
    ///
    /// A malformed document is logged and treated as empty; it is replaced
    /// by the next successful write.
    pub fn open(dir: &Path, namespace: &str) -> Result<Self, StoreError> {
        let file_path = dir.join(format!("{}.json", namespace));
        crate::debug!("Opening key-value store at {:?}", file_path);

        let entries = if file_path.exists() {
            let content = fs::read_to_string(&file_path)
                .map_err(|e| StoreError::ReadError(format!("{}: {}", file_path.display(), e)))?;
            match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    crate::warn!(
                        "Store file {:?} is malformed, starting empty: {}",
                        file_path,
                        e
                    );
                    BTreeMap::new()
                }
            }
        } else {
            crate::debug!("No store file found, starting with empty store");
            BTreeMap::new()
        };

        crate::info!("Loaded {} keys from {:?}", entries.len(), file_path);
        Ok(Self {
            entries: Mutex::new(entries),
            file_path,
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Persist entries to the file using atomic write (temp file + rename)
    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        // Ensure parent directory exists
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::PersistenceError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::PersistenceError(e.to_string()))?;

        let temp_path = self.file_path.with_extension("tmp");

        {
            let mut file = File::create(&temp_path).map_err(|e| {
                StoreError::PersistenceError(format!("Failed to create temp file: {}", e))
            })?;
            file.write_all(content.as_bytes())
                .map_err(|e| StoreError::PersistenceError(format!("Failed to write: {}", e)))?;
            file.sync_all()
                .map_err(|e| StoreError::PersistenceError(format!("Failed to sync: {}", e)))?;
        }

        fs::rename(&temp_path, &self.file_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StoreError::PersistenceError(format!("Failed to rename: {}", e))
        })?;

        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let writes = batch.len();

        // Hold the lock across the write so concurrent batches serialize
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        apply_to_map(&mut next, batch);
        self.save(&next)?;
        *entries = next;

        crate::debug!("Applied {} writes to {:?}", writes, self.file_path);
        Ok(())
    }
}

#[cfg(test)]
#[path = "json_file_test.rs"]
mod tests;
