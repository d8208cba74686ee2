// Application context: owns the stores, the lock gate and, once unlocked,
// the recording repository.

use crate::config::{AppConfig, ConfigError};
use crate::date_key::DateKey;
use crate::events::RepositoryEventEmitter;
use crate::fs::{FileSystem, LocalFileSystem};
use crate::lock::{LockError, LockGate, PasswordLock};
use crate::repository::{PendingArchive, PendingImage, RecordingRepository};
use crate::store::{JsonFileStore, KeyValueStore, StoreError};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Error types for application setup and context operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Lock(#[from] LockError),
    /// The journal has not been unlocked yet
    #[error("Journal is locked")]
    Locked,
}

/// Services shared by every screen of the app
pub struct AppContext {
    config: AppConfig,
    journal_store: Arc<dyn KeyValueStore>,
    fs: Arc<dyn FileSystem>,
    lock: Arc<PasswordLock>,
    emitter: Arc<dyn RepositoryEventEmitter>,
    repository: Mutex<Option<Arc<RecordingRepository>>>,
}

impl AppContext {
    /// Create the app directories and open the file-backed stores
    pub fn open(
        config: AppConfig,
        emitter: Arc<dyn RepositoryEventEmitter>,
    ) -> Result<Self, AppError> {
        config.ensure_dirs()?;

        let journal_store = JsonFileStore::open(&config.data_dir, &config.prefs_namespace)?;
        let lock_store = JsonFileStore::open(&config.data_dir, &config.lock_namespace)?;
        let lock = PasswordLock::new(Arc::new(lock_store));

        crate::info!("App context opened at {:?}", config.data_dir);
        Ok(Self::with_services(
            config,
            Arc::new(journal_store),
            Arc::new(LocalFileSystem),
            Arc::new(lock),
            emitter,
        ))
    }

    /// Assemble a context from already-built services
    pub fn with_services(
        config: AppConfig,
        journal_store: Arc<dyn KeyValueStore>,
        fs: Arc<dyn FileSystem>,
        lock: Arc<PasswordLock>,
        emitter: Arc<dyn RepositoryEventEmitter>,
    ) -> Self {
        Self {
            config,
            journal_store,
            fs,
            lock,
            emitter,
            repository: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn lock(&self) -> &PasswordLock {
        &self.lock
    }

    /// Check the secret against the lock gate and load the journal.
    ///
    /// When the gate is disabled the secret is ignored. Unlocking again
    /// returns the already loaded repository.
    pub fn unlock(&self, secret: &str) -> Result<Arc<RecordingRepository>, LockError> {
        let mut slot = self.repository.lock();
        if let Some(repository) = slot.as_ref() {
            return Ok(repository.clone());
        }

        if self.lock.is_enabled() && !self.lock.verify(secret) {
            crate::warn!("Unlock attempt rejected");
            return Err(LockError::IncorrectPassword);
        }

        let repository = Arc::new(RecordingRepository::new(
            self.journal_store.clone(),
            self.fs.clone(),
            self.emitter.clone(),
        ));
        repository.load();
        *slot = Some(repository.clone());
        Ok(repository)
    }

    /// The loaded repository, if the journal has been unlocked
    pub fn repository(&self) -> Option<Arc<RecordingRepository>> {
        self.repository.lock().clone()
    }

    /// Copy an image into the local cache and attach it to `date`.
    ///
    /// The copy runs on the persistence worker; the returned handle resolves
    /// to the attached reference.
    pub fn cache_image(&self, date: DateKey, source: &Path) -> Result<PendingImage, AppError> {
        let repository = self.repository().ok_or(AppError::Locked)?;
        let target = self.config.image_cache_path(date);
        Ok(repository.cache_image(date, source.to_path_buf(), target))
    }

    /// Export every recording into the archive in the data directory
    pub fn export_archive(&self) -> Result<PendingArchive, AppError> {
        let repository = self.repository().ok_or(AppError::Locked)?;
        Ok(repository.export_archive(self.config.archive_path()))
    }

    /// Persist pending state and wait for the worker; call before exit
    pub fn shutdown(&self) {
        if let Some(repository) = self.repository() {
            repository.on_pause();
            if let Err(e) = repository.flush() {
                crate::error!("Failed to flush journal on shutdown: {}", e);
            }
        }
        crate::info!("App context shut down");
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
