// In-process key-value store for hosts that persist elsewhere, and for tests

use super::{apply_to_map, KeyValueStore, StoreError, WriteBatch};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Volatile store; `apply` is atomic with respect to concurrent readers
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    batches_applied: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing key/value pairs
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Mutex::new(map),
            batches_applied: Mutex::new(0),
        }
    }

    /// Number of non-empty batches applied so far
    pub fn batches_applied(&self) -> usize {
        *self.batches_applied.lock()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        apply_to_map(&mut self.entries.lock(), batch);
        *self.batches_applied.lock() += 1;
        Ok(())
    }
}
