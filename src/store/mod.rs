//! Durable key-value storage for journal tables.
//!
//! The repository only needs a string → string mapping with an atomic
//! batch write. Hosts that already own a preference store can implement
//! [`KeyValueStore`] directly; otherwise [`JsonFileStore`] keeps one JSON
//! object file per namespace.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Namespace holding every journal table
pub const RECORDINGS_PREFS: &str = "recordings_prefs";

/// Keys inside the journal namespace
pub mod keys {
    pub const RECORDINGS: &str = "recordings_data";
    pub const DAY_TITLES: &str = "day_titles_data";
    pub const BDAY_DATES: &str = "bday_dates";
    pub const IMAGE_URIS: &str = "image_uris_by_date";
    pub const SELECTED_DATE: &str = "selected_date";
}

/// Error types for store operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// Failed to read the backing storage
    #[error("Failed to read store: {0}")]
    ReadError(String),
    /// Failed to persist a batch
    #[error("Failed to persist store: {0}")]
    PersistenceError(String),
}

/// A single key write inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    Put { key: String, value: String },
    Remove { key: String },
}

/// Ordered set of key writes applied all-or-nothing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    writes: Vec<StoreWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.writes.push(StoreWrite::Put {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.writes.push(StoreWrite::Remove { key: key.into() });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn writes(&self) -> &[StoreWrite] {
        &self.writes
    }
}

/// Persistent string → string mapping.
///
/// `apply` must make either every write in the batch durable or none of them.
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key was never written
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Atomically apply a batch of writes
    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

/// Apply a batch to an in-memory map (shared by the shipped stores)
pub(crate) fn apply_to_map(
    map: &mut std::collections::BTreeMap<String, String>,
    batch: WriteBatch,
) {
    for write in batch.writes {
        match write {
            StoreWrite::Put { key, value } => {
                map.insert(key, value);
            }
            StoreWrite::Remove { key } => {
                map.remove(&key);
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
