//! Recording repository: the single source of truth for per-date journal data.
//!
//! The repository owns the aggregate (recordings, day titles, birthday
//! marks, image references and the last selected date). Every operation
//! applies its in-memory effect synchronously on the calling thread and then
//! hands persistence to the background worker, so callers never wait on I/O.
//!
//! ## Usage
//!
//! ```ignore
//! let repo = RecordingRepository::new(store, Arc::new(LocalFileSystem), emitter);
//! repo.load();
//! let record = repo.add_recording(date, "/data/a.3gp", "a.3gp", now_ms)?;
//! let pending = repo.delete_recording(date, &record);
//! ```

mod archive;
mod codec;
mod pending;
mod reconcile;
mod state;
mod worker;

pub use archive::{ArchiveError, ArchiveSummary, ARCHIVE_FILE_NAME};
pub use codec::DecodeFailure;
pub use pending::Pending;
pub use reconcile::ReconcileOutcome;
pub use state::{
    normalize_title, ImageRef, RecordingRecord, RecordingRepositoryState, RECORDING_WORD,
};
pub use worker::WorkerError;

use crate::date_key::DateKey;
use crate::events::RepositoryEventEmitter;
use crate::fs::{DeleteError, FileSystem};
use crate::store::KeyValueStore;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use worker::{PersistWorkerHandle, WorkerContext};

/// Error types for repository operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    /// File missing or empty at registration time
    #[error("Recording file is invalid: {0}")]
    InvalidRecording(String),
    /// The date already tracks a recording at this path
    #[error("Recording {0} is already tracked for this date")]
    DuplicateRecording(String),
    /// No recording with this path is tracked for the date
    #[error("Recording {0} not found")]
    RecordingNotFound(String),
}

/// Outcome of a physical deletion that failed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeletionError {
    /// One or more files could not be removed; their metadata is gone regardless
    #[error("{} file(s) could not be deleted", .0.len())]
    Failed(Vec<DeleteError>),
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// Failure to attach a locally cached image
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ImageCacheError {
    /// The source could not be copied into the cache
    #[error("Failed to cache image: {0}")]
    CopyFailed(String),
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// Completion of a background file deletion.
///
/// Failures are also reported through
/// [`RepositoryEventEmitter::emit_delete_failed`].
pub type PendingDeletion = Pending<(), DeletionError>;

/// Completion of an image copy; resolves to the attached reference
pub type PendingImage = Pending<ImageRef, ImageCacheError>;

/// Completion of an archive export
pub type PendingArchive = Pending<ArchiveSummary, ArchiveError>;

/// Per-date recording repository with background persistence
pub struct RecordingRepository {
    state: Arc<RwLock<RecordingRepositoryState>>,
    store: Arc<dyn KeyValueStore>,
    fs: Arc<dyn FileSystem>,
    worker: PersistWorkerHandle,
}

impl RecordingRepository {
    /// Create an empty repository and spawn its persistence worker.
    ///
    /// Call [`RecordingRepository::load`] before use.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        fs: Arc<dyn FileSystem>,
        emitter: Arc<dyn RepositoryEventEmitter>,
    ) -> Self {
        let state = Arc::new(RwLock::new(RecordingRepositoryState::new()));
        let worker = PersistWorkerHandle::spawn(WorkerContext {
            state: state.clone(),
            store: store.clone(),
            fs: fs.clone(),
            emitter,
        });
        Self {
            state,
            store,
            fs,
            worker,
        }
    }

    /// Decode every table from the store and start a reconciliation pass.
    ///
    /// Tables that fail to decode start empty. Until reconciliation finishes,
    /// the returned snapshot may still reference files that no longer exist.
    pub fn load(&self) -> RecordingRepositoryState {
        let decoded = codec::decode(self.store.as_ref());
        crate::info!(
            "Loaded {} recordings across {} dates ({} tables reset)",
            decoded.state.recording_count(),
            decoded.state.recordings_by_date().len(),
            decoded.failures.len()
        );

        let snapshot = decoded.state.clone();
        *self.state.write() = decoded.state;

        if let Err(e) = self.worker.reconcile() {
            crate::error!("Could not schedule reconciliation: {}", e);
        }
        snapshot
    }

    /// Register a finished capture. See [`Self::add_recording_with_duration`].
    pub fn add_recording(
        &self,
        date: DateKey,
        file_path: impl Into<String>,
        file_name: impl Into<String>,
        timestamp: i64,
    ) -> Result<RecordingRecord, RepositoryError> {
        self.add_recording_with_duration(date, file_path, file_name, timestamp, 0)
    }

    /// Register a finished capture with a known duration.
    ///
    /// Rejects files that do not exist or are empty (a failed capture)
    /// without touching the aggregate.
    pub fn add_recording_with_duration(
        &self,
        date: DateKey,
        file_path: impl Into<String>,
        file_name: impl Into<String>,
        timestamp: i64,
        duration_ms: u64,
    ) -> Result<RecordingRecord, RepositoryError> {
        let mut record = RecordingRecord::new(file_path, file_name, timestamp);
        record.duration_ms = duration_ms;

        match self.fs.length(record.path()) {
            None => {
                return Err(RepositoryError::InvalidRecording(format!(
                    "{} does not exist",
                    record.file_path
                )))
            }
            Some(0) => {
                return Err(RepositoryError::InvalidRecording(format!(
                    "{} is empty",
                    record.file_path
                )))
            }
            Some(_) => {}
        }

        if !self.state.write().insert_recording(date, record.clone()) {
            return Err(RepositoryError::DuplicateRecording(record.file_path));
        }

        crate::debug!("Added recording {} for {}", record.file_path, date);
        self.schedule_persist();
        Ok(record)
    }

    /// Set or clear a recording's custom title, returning the updated record
    pub fn set_custom_title(
        &self,
        date: DateKey,
        record: &RecordingRecord,
        new_title: &str,
    ) -> Result<RecordingRecord, RepositoryError> {
        let updated = self
            .state
            .write()
            .update_custom_title(&date, &record.file_path, new_title)
            .ok_or_else(|| RepositoryError::RecordingNotFound(record.file_path.clone()))?;

        self.schedule_persist();
        Ok(updated)
    }

    /// Stop tracking a recording and delete its file in the background.
    ///
    /// The metadata is removed immediately and is not restored if the
    /// physical delete fails. Deleting an untracked record is a no-op: its
    /// file is left alone, since another date may still reference it.
    pub fn delete_recording(&self, date: DateKey, record: &RecordingRecord) -> PendingDeletion {
        let removed = {
            let mut state = self.state.write();
            state
                .remove_recording(&date, &record.file_path)
                .filter(|r| !state.is_path_tracked(&r.file_path))
        };

        let Some(removed) = removed else {
            crate::debug!("Recording {} not deleted for {}", record.file_path, date);
            return PendingDeletion::ready(Ok(()));
        };

        let pending = self.delete_files(vec![removed.path().to_path_buf()]);
        self.schedule_persist();
        pending
    }

    /// Stop tracking every recording for a date and delete their files
    pub fn delete_all_for_date(&self, date: DateKey) -> PendingDeletion {
        let paths: Vec<PathBuf> = {
            let mut state = self.state.write();
            let removed = state.remove_date(&date);
            removed
                .iter()
                .filter(|r| !state.is_path_tracked(&r.file_path))
                .map(|r| r.path().to_path_buf())
                .collect()
        };
        crate::debug!("Removing {} recording files for {}", paths.len(), date);

        let pending = self.delete_files(paths);
        self.schedule_persist();
        pending
    }

    /// Set the day title; blank titles remove it
    pub fn set_day_title(&self, date: DateKey, title: &str) {
        self.state.write().set_day_title(date, title);
        self.schedule_persist();
    }

    /// Flip the birthday mark for a date, returning the new state
    pub fn toggle_special_date(&self, date: DateKey) -> bool {
        let marked = self.state.write().toggle_special_date(date);
        self.schedule_persist();
        marked
    }

    /// Attach an image to a date. A replaced locally cached file is deleted.
    pub fn set_image_ref(&self, date: DateKey, image: ImageRef) {
        let previous = self.state.write().set_image_ref(date, image.clone());
        if let Some(previous) = previous.filter(|p| *p != image) {
            self.delete_cached_image(&previous);
        }
        self.schedule_persist();
    }

    /// Detach the image from a date, deleting it if it was cached locally
    pub fn clear_image_ref(&self, date: DateKey) -> Option<ImageRef> {
        let removed = self.state.write().clear_image_ref(&date);
        if let Some(image) = &removed {
            self.delete_cached_image(image);
        }
        self.schedule_persist();
        removed
    }

    /// Copy `source` to the local cache path `target` and attach it to `date`.
    ///
    /// The copy runs on the worker after every job queued before it, so an
    /// earlier delete of the same cache path can never remove the new copy.
    /// The reference becomes visible once the copy has succeeded.
    pub fn cache_image(&self, date: DateKey, source: PathBuf, target: PathBuf) -> PendingImage {
        match self.worker.cache_image(date, source, target) {
            Ok(receiver) => PendingImage::from_receiver(receiver),
            Err(e) => {
                crate::error!("Could not schedule image caching: {}", e);
                PendingImage::disconnected()
            }
        }
    }

    /// Zip every recording whose file exists into `target`, on the worker
    pub fn export_archive(&self, target: PathBuf) -> PendingArchive {
        match self.worker.export_archive(target) {
            Ok(receiver) => PendingArchive::from_receiver(receiver),
            Err(e) => {
                crate::error!("Could not schedule archive export: {}", e);
                PendingArchive::disconnected()
            }
        }
    }

    /// Remember the last active date
    pub fn set_selected_date(&self, date: Option<DateKey>) {
        self.state.write().set_selected_date(date);
        self.schedule_persist();
    }

    /// Flush hook for when the controller loses foreground focus
    pub fn on_pause(&self) {
        crate::debug!("Controller paused, scheduling persist");
        self.schedule_persist();
    }

    /// Block until every job scheduled so far has executed.
    ///
    /// Intended for shutdown paths; interactive code should not wait on the worker.
    #[must_use = "this returns a Result that should be handled"]
    pub fn flush(&self) -> Result<(), WorkerError> {
        self.worker.flush()
    }

    // ---- queries ----

    /// Copy of the whole aggregate
    pub fn snapshot(&self) -> RecordingRepositoryState {
        self.state.read().clone()
    }

    /// Recordings for a date, newest first
    pub fn recordings_for_date(&self, date: DateKey) -> Vec<RecordingRecord> {
        self.state.read().recordings_for_date(&date)
    }

    pub fn dates_with_recordings(&self) -> BTreeSet<DateKey> {
        self.state.read().dates_with_recordings()
    }

    pub fn special_dates(&self) -> BTreeSet<DateKey> {
        self.state.read().special_dates().clone()
    }

    pub fn is_special_date(&self, date: DateKey) -> bool {
        self.state.read().is_special_date(&date)
    }

    pub fn day_title(&self, date: DateKey) -> Option<String> {
        self.state.read().day_title(&date).map(str::to_string)
    }

    pub fn image_ref(&self, date: DateKey) -> Option<ImageRef> {
        self.state.read().image_ref(&date).cloned()
    }

    pub fn selected_date(&self) -> Option<DateKey> {
        self.state.read().selected_date()
    }

    // ---- internals ----

    fn schedule_persist(&self) {
        if let Err(e) = self.worker.persist() {
            crate::error!("Could not schedule persist: {}", e);
        }
    }

    fn delete_files(&self, paths: Vec<PathBuf>) -> PendingDeletion {
        match self.worker.delete_files(paths) {
            Ok(receiver) => PendingDeletion::from_receiver(receiver),
            Err(e) => {
                crate::error!("Could not schedule file deletion: {}", e);
                PendingDeletion::disconnected()
            }
        }
    }

    fn delete_cached_image(&self, image: &ImageRef) {
        if let Some(path) = image.local_path() {
            if let Err(e) = self.worker.delete_image(path.to_path_buf()) {
                crate::error!("Could not schedule image deletion: {}", e);
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
