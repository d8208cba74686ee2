// Dedicated persistence thread for the recording repository
//
// Every store write and every filesystem probe, copy or delete runs here, in
// submission order, so the interactive thread never blocks on I/O and two
// encodes of the aggregate can never interleave.

use super::archive::{self, ArchiveError, ArchiveSummary};
use super::codec;
use super::reconcile;
use super::state::{ImageRef, RecordingRepositoryState};
use super::{DeletionError, ImageCacheError};
use crate::date_key::DateKey;
use crate::events::{
    DeleteFailedPayload, PersistFailedPayload, ReconciliationCompletedPayload,
    RecordingsChangedPayload, RepositoryEventEmitter,
};
use crate::fs::FileSystem;
use crate::store::KeyValueStore;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;

/// Reply channel of a job whose outcome the caller may await
pub type Reply<T, E> = oneshot::Sender<Result<T, E>>;

/// Commands sent to the worker thread
pub enum WorkerCommand {
    /// Encode the current aggregate and write every table in one batch
    Persist,
    /// Drop references to missing files, then persist
    Reconcile,
    /// Remove recording files; failures are reported back on the channel
    DeleteFiles {
        paths: Vec<PathBuf>,
        response_tx: Reply<(), DeletionError>,
    },
    /// Remove a locally cached image file unless a date references it again
    DeleteImage(PathBuf),
    /// Copy an image into the local cache, then attach it to the date
    CacheImage {
        date: DateKey,
        source: PathBuf,
        target: PathBuf,
        response_tx: Reply<ImageRef, ImageCacheError>,
    },
    /// Zip every existing recording into `target`
    ExportArchive {
        target: PathBuf,
        response_tx: Reply<ArchiveSummary, ArchiveError>,
    },
    /// Reply once every earlier command has run
    Flush(Sender<()>),
    /// Stop the worker after draining earlier commands
    Shutdown,
}

/// Everything a job may touch
#[derive(Clone)]
pub struct WorkerContext {
    pub state: Arc<RwLock<RecordingRepositoryState>>,
    pub store: Arc<dyn KeyValueStore>,
    pub fs: Arc<dyn FileSystem>,
    pub emitter: Arc<dyn RepositoryEventEmitter>,
}

/// Errors from worker operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorkerError {
    /// The worker thread has exited
    #[error("Persistence worker disconnected")]
    ThreadDisconnected,
}

/// Handle to the persistence thread
///
/// When dropped, the worker finishes every queued job and then exits.
pub struct PersistWorkerHandle {
    sender: Sender<WorkerCommand>,
    thread: Option<JoinHandle<()>>,
}

impl PersistWorkerHandle {
    /// Spawn a new persistence thread
    pub fn spawn(context: WorkerContext) -> Self {
        let (sender, receiver) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("sayday-persist".to_string())
            .spawn(move || worker_main(receiver, context))
            .map_err(|e| crate::error!("Failed to spawn persistence worker: {}", e))
            .ok();

        Self { sender, thread }
    }

    fn send(&self, command: WorkerCommand) -> Result<(), WorkerError> {
        self.sender
            .send(command)
            .map_err(|_| WorkerError::ThreadDisconnected)
    }

    /// Queue a persist of the aggregate as it will be when the job runs
    pub fn persist(&self) -> Result<(), WorkerError> {
        self.send(WorkerCommand::Persist)
    }

    /// Queue a reconciliation pass
    pub fn reconcile(&self) -> Result<(), WorkerError> {
        self.send(WorkerCommand::Reconcile)
    }

    /// Queue deletion of recording files
    pub fn delete_files(
        &self,
        paths: Vec<PathBuf>,
    ) -> Result<oneshot::Receiver<Result<(), DeletionError>>, WorkerError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(WorkerCommand::DeleteFiles { paths, response_tx })?;
        Ok(response_rx)
    }

    /// Queue deletion of a cached image file
    pub fn delete_image(&self, path: PathBuf) -> Result<(), WorkerError> {
        self.send(WorkerCommand::DeleteImage(path))
    }

    /// Queue a copy into the image cache
    pub fn cache_image(
        &self,
        date: DateKey,
        source: PathBuf,
        target: PathBuf,
    ) -> Result<oneshot::Receiver<Result<ImageRef, ImageCacheError>>, WorkerError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(WorkerCommand::CacheImage {
            date,
            source,
            target,
            response_tx,
        })?;
        Ok(response_rx)
    }

    /// Queue an archive export
    pub fn export_archive(
        &self,
        target: PathBuf,
    ) -> Result<oneshot::Receiver<Result<ArchiveSummary, ArchiveError>>, WorkerError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(WorkerCommand::ExportArchive {
            target,
            response_tx,
        })?;
        Ok(response_rx)
    }

    /// Block until every command queued before this call has run
    #[must_use = "this returns a Result that should be handled"]
    pub fn flush(&self) -> Result<(), WorkerError> {
        let (done_tx, done_rx) = mpsc::channel();
        self.send(WorkerCommand::Flush(done_tx))?;
        done_rx.recv().map_err(|_| WorkerError::ThreadDisconnected)
    }
}

impl Drop for PersistWorkerHandle {
    /// Drain pending jobs and join the thread.
    fn drop(&mut self) {
        // Ignore errors if the thread already exited
        let _ = self.sender.send(WorkerCommand::Shutdown);

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                crate::error!("Persistence worker panicked");
            }
        }
    }
}

/// Main loop for the persistence thread
fn worker_main(receiver: Receiver<WorkerCommand>, context: WorkerContext) {
    crate::debug!("Persistence worker started");

    while let Ok(command) = receiver.recv() {
        match command {
            WorkerCommand::Persist => persist(&context),
            WorkerCommand::Reconcile => {
                reconcile_files(&context);
                persist(&context);
            }
            WorkerCommand::DeleteFiles { paths, response_tx } => {
                let result = delete_files(&context, &paths);
                // Caller may have dropped the pending handle
                let _ = response_tx.send(result);
            }
            WorkerCommand::DeleteImage(path) => delete_unreferenced_image(&context, &path),
            WorkerCommand::CacheImage {
                date,
                source,
                target,
                response_tx,
            } => {
                let result = cache_image(&context, date, &source, &target);
                let _ = response_tx.send(result);
            }
            WorkerCommand::ExportArchive {
                target,
                response_tx,
            } => {
                let snapshot = context.state.read().clone();
                let result = archive::write_archive(&snapshot, context.fs.as_ref(), &target);
                match &result {
                    Ok(summary) => crate::info!(
                        "Archived {} recordings into {:?}",
                        summary.file_count,
                        summary.path
                    ),
                    Err(e) => crate::warn!("Archive export failed: {}", e),
                }
                let _ = response_tx.send(result);
            }
            WorkerCommand::Flush(done_tx) => {
                let _ = done_tx.send(());
            }
            WorkerCommand::Shutdown => {
                crate::debug!("Received SHUTDOWN command");
                break;
            }
        }
    }

    crate::debug!("Persistence worker exiting");
}

/// Snapshot the aggregate and write every table
fn persist(context: &WorkerContext) {
    // Clone under the read lock, encode outside it
    let snapshot = context.state.read().clone();

    let result = codec::encode(&snapshot)
        .map_err(|e| e.to_string())
        .and_then(|batch| context.store.apply(batch).map_err(|e| e.to_string()));

    match result {
        Ok(()) => crate::trace!(
            "Persisted {} recordings across {} dates",
            snapshot.recording_count(),
            snapshot.recordings_by_date().len()
        ),
        Err(message) => {
            crate::error!("Failed to persist journal: {}", message);
            context
                .emitter
                .emit_persist_failed(PersistFailedPayload { message });
        }
    }
}

fn reconcile_files(context: &WorkerContext) {
    let snapshot = context.state.read().clone();
    let stale = reconcile::scan(&snapshot, context.fs.as_ref());

    let outcome = if stale.is_empty() {
        reconcile::ReconcileOutcome::default()
    } else {
        reconcile::apply(&mut context.state.write(), &stale)
    };

    if outcome.has_drift() {
        crate::info!(
            "Reconciliation removed {} recordings and {} images with missing files",
            outcome.removed_recordings,
            outcome.removed_images
        );
    }
    if !outcome.changed_dates.is_empty() {
        context.emitter.emit_recordings_changed(RecordingsChangedPayload {
            reason: "reconcile".to_string(),
            dates: outcome.changed_dates.iter().map(|d| d.to_string()).collect(),
        });
    }
    context
        .emitter
        .emit_reconciliation_completed(ReconciliationCompletedPayload {
            removed_recordings: outcome.removed_recordings,
            removed_images: outcome.removed_images,
        });
}

fn delete_files(context: &WorkerContext, paths: &[PathBuf]) -> Result<(), DeletionError> {
    let mut failures = Vec::new();
    for path in paths {
        match context.fs.delete(path) {
            Ok(()) => crate::debug!("Deleted {:?}", path),
            Err(e) => {
                crate::warn!("{}", e);
                context.emitter.emit_delete_failed(DeleteFailedPayload {
                    file_path: e.path.clone(),
                    message: e.message.clone(),
                });
                failures.push(e);
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(DeletionError::Failed(failures))
    }
}

fn is_image_referenced(state: &RecordingRepositoryState, path: &Path) -> bool {
    state
        .image_ref_by_date()
        .values()
        .any(|image| image.local_path() == Some(path))
}

/// Delete a cached image, unless a later job attached the same path again
fn delete_unreferenced_image(context: &WorkerContext, path: &Path) {
    if is_image_referenced(&context.state.read(), path) {
        crate::debug!("Keeping cached image {:?}, it is referenced again", path);
        return;
    }
    if let Err(e) = context.fs.delete(path) {
        crate::warn!("Failed to delete cached image: {}", e);
    }
}

fn cache_image(
    context: &WorkerContext,
    date: DateKey,
    source: &Path,
    target: &Path,
) -> Result<ImageRef, ImageCacheError> {
    context.fs.copy(source, target).map_err(|e| {
        crate::warn!("Failed to cache image for {}: {}", date, e);
        ImageCacheError::CopyFailed(format!(
            "{} -> {}: {}",
            source.display(),
            target.display(),
            e
        ))
    })?;

    let image = ImageRef::new(target.to_string_lossy());
    let previous = context.state.write().set_image_ref(date, image.clone());
    if let Some(old_path) = previous
        .as_ref()
        .filter(|p| **p != image)
        .and_then(ImageRef::local_path)
    {
        delete_unreferenced_image(context, old_path);
    }

    crate::debug!("Cached image for {} at {:?}", date, target);
    persist(context);
    Ok(image)
}

#[cfg(test)]
#[path = "worker_test.rs"]
mod tests;
