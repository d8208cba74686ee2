// Per-date voice journal core: recording repository, background persistence,
// filesystem reconciliation and the optional password lock.

// Enable coverage attribute on nightly for explicit exclusions
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod app;
pub mod capture;
pub mod config;
pub mod date_key;
pub mod events;
pub mod fs;
pub mod lock;
pub mod repository;
pub mod store;

// Re-export log macros for use throughout the crate
pub use log::{debug, error, info, trace, warn};

pub use app::{AppContext, AppError};
pub use capture::{AudioEngine, CaptureError};
pub use config::{AppConfig, ConfigError};
pub use date_key::{DateKey, DateKeyError};
pub use events::{LoggingEventEmitter, RepositoryEventEmitter};
pub use fs::{FileSystem, LocalFileSystem};
pub use lock::{LockError, LockGate, PasswordLock};
pub use repository::{
    ArchiveError, ArchiveSummary, DeletionError, ImageCacheError, ImageRef, Pending,
    PendingArchive, PendingDeletion, PendingImage, RecordingRecord, RecordingRepository,
    RecordingRepositoryState, RepositoryError,
};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};

/// Install the process logger.
///
/// Defaults to `Debug` in debug builds and `Info` in release; `RUST_LOG`
/// overrides either. Calling it twice is harmless.
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn init_logging() {
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let result = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at {}", level);
    }
}
