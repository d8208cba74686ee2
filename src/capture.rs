// Capture flow: names the file, drives the audio engine, enforces the maximum
// duration and registers the finished file with the repository.

use crate::config::AppConfig;
use crate::date_key::DateKey;
use crate::repository::{RecordingRecord, RecordingRepository, RepositoryError, RECORDING_WORD};
use async_trait::async_trait;
use chrono::{Local, NaiveTime};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Extension of capture files
pub const RECORDING_EXTENSION: &str = "3gp";

/// Time-of-day segment of a capture file name
const FILE_TIME_FORMAT: &str = "%H-%M-%S";

/// Error types for the capture flow
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CaptureError {
    /// The audio engine failed to start, stop or play
    #[error("Audio engine error: {0}")]
    EngineError(String),
    /// Playback target is gone
    #[error("Recording file not found: {0}")]
    FileNotFound(String),
    /// The captured file was not accepted by the repository
    #[error(transparent)]
    Registration(#[from] RepositoryError),
}

/// Platform audio capture and playback
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Record into `target`; resolves with the written file once capture ends
    async fn start_capture(&self, target: &Path) -> Result<PathBuf, CaptureError>;

    /// End the running capture, making `start_capture` resolve
    async fn stop_capture(&self) -> Result<(), CaptureError>;

    async fn play(&self, path: &Path) -> Result<(), CaptureError>;
}

/// File name for a capture started at `time` on `date`
///
/// Produces `Recording_<YYYY-MM-DD>_<HH-mm-ss>.3gp`.
pub fn generate_file_name(date: DateKey, time: NaiveTime) -> String {
    format!(
        "{}_{}_{}.{}",
        RECORDING_WORD,
        date,
        time.format(FILE_TIME_FORMAT),
        RECORDING_EXTENSION
    )
}

/// Record a memo for `date` and register it.
///
/// The capture ends when the user stops the engine or when
/// `config.max_recording_duration` elapses, whichever comes first.
pub async fn record_for_date(
    engine: &dyn AudioEngine,
    repository: &RecordingRepository,
    config: &AppConfig,
    date: DateKey,
) -> Result<RecordingRecord, CaptureError> {
    let now = Local::now();
    let file_name = generate_file_name(date, now.time());
    let target = config.recording_path(&file_name);
    let limit = config.max_recording_duration;

    crate::info!("Starting capture for {} into {:?}", date, target);
    let started = Instant::now();

    let capture = engine.start_capture(&target);
    tokio::pin!(capture);

    let written = tokio::select! {
        result = &mut capture => result?,
        _ = tokio::time::sleep(limit) => {
            crate::info!("Capture reached the {:?} limit, stopping", limit);
            engine.stop_capture().await?;
            capture.await?
        }
    };

    let duration_ms = elapsed_ms(started.elapsed(), limit);
    crate::debug!("Capture finished after {} ms", duration_ms);

    let record = repository.add_recording_with_duration(
        date,
        written.to_string_lossy(),
        file_name,
        now.timestamp_millis(),
        duration_ms,
    )?;
    Ok(record)
}

/// Play a recording, failing early if its file has vanished
pub async fn play_recording(
    engine: &dyn AudioEngine,
    record: &RecordingRecord,
) -> Result<(), CaptureError> {
    if !record.path().is_file() {
        return Err(CaptureError::FileNotFound(record.file_path.clone()));
    }
    engine.play(record.path()).await
}

fn elapsed_ms(elapsed: Duration, limit: Duration) -> u64 {
    let capped = elapsed.min(limit);
    u64::try_from(capped.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[path = "capture_test.rs"]
mod tests;
