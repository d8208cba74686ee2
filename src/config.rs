// Application paths and tunables
// Everything has a platform default and can be overridden before the app context is built

use crate::date_key::DateKey;
use crate::repository::ARCHIVE_FILE_NAME;
use crate::store::RECORDINGS_PREFS;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_DIR_NAME: &str = "sayday";
pub const RECORDINGS_DIR_NAME: &str = "recordings";
pub const IMAGES_DIR_NAME: &str = "images";
pub const LOCK_PREFS: &str = "lock_prefs";

/// Captures are stopped automatically after this long
pub const MAX_RECORDING_DURATION_MS: u64 = 2_400_000;

/// Error types for configuration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Platform data directory could not be determined
    #[error("App data directory not found")]
    DataDirNotFound,
    /// Failed to create one of the app directories
    #[error("Failed to create directory: {0}")]
    DirectoryCreationFailed(String),
}

/// Resolved application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Root for store files
    pub data_dir: PathBuf,
    /// Namespace of the journal tables
    pub prefs_namespace: String,
    /// Namespace of the lock gate credentials
    pub lock_namespace: String,
    /// Where the audio engine writes captures
    pub recordings_dir: PathBuf,
    /// Local copies of attached images
    pub images_dir: PathBuf,
    /// Watchdog limit for a single capture
    pub max_recording_duration: Duration,
}

impl AppConfig {
    /// Configuration rooted at an explicit directory
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            recordings_dir: data_dir.join(RECORDINGS_DIR_NAME),
            images_dir: data_dir.join(IMAGES_DIR_NAME),
            data_dir,
            prefs_namespace: RECORDINGS_PREFS.to_string(),
            lock_namespace: LOCK_PREFS.to_string(),
            max_recording_duration: Duration::from_millis(MAX_RECORDING_DURATION_MS),
        }
    }

    /// Configuration under `{platform_data_dir}/sayday/`
    pub fn default_paths() -> Result<Self, ConfigError> {
        let data_dir = dirs::data_dir().ok_or(ConfigError::DataDirNotFound)?;
        Ok(Self::in_dir(data_dir.join(APP_DIR_NAME)))
    }

    pub fn with_max_recording_duration(mut self, limit: Duration) -> Self {
        self.max_recording_duration = limit;
        self
    }

    /// Path of the locally cached image for a date
    pub fn image_cache_path(&self, date: DateKey) -> PathBuf {
        self.images_dir.join(format!("image_{}.jpg", date))
    }

    /// Absolute path for a capture file name
    pub fn recording_path(&self, file_name: &str) -> PathBuf {
        self.recordings_dir.join(file_name)
    }

    /// Where recording exports are written
    pub fn archive_path(&self) -> PathBuf {
        self.data_dir.join(ARCHIVE_FILE_NAME)
    }

    /// Create every directory the app writes into
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        for dir in [&self.data_dir, &self.recordings_dir, &self.images_dir] {
            create_dir(dir)?;
        }
        Ok(())
    }
}

fn create_dir(dir: &Path) -> Result<(), ConfigError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        ConfigError::DirectoryCreationFailed(format!("{}: {}", dir.display(), e))
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
