//! In-memory aggregate owned by the recording repository.
//!
//! Everything here is pure data manipulation; no I/O happens in this module.
//! The repository wraps the aggregate in a lock and schedules persistence
//! after each of these mutations.

use crate::date_key::DateKey;
use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Word used for derived titles and generated file names
pub const RECORDING_WORD: &str = "Recording";

/// Display format for derived titles, e.g. "Mar 1, 2024, 14:05"
const DISPLAY_TITLE_FORMAT: &str = "%b %-d, %Y, %H:%M";

/// One captured voice memo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingRecord {
    /// Absolute path to the audio file; unique within a date
    pub file_path: String,
    /// Display name, usually encoding date and time
    pub file_name: String,
    /// Creation instant in milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Length in milliseconds, 0 when unknown
    #[serde(default, rename = "duration")]
    pub duration_ms: u64,
    /// User label; empty means "use the derived title"
    #[serde(default)]
    pub custom_title: String,
}

impl RecordingRecord {
    pub fn new(file_path: impl Into<String>, file_name: impl Into<String>, timestamp: i64) -> Self {
        Self {
            file_path: file_path.into(),
            file_name: file_name.into(),
            timestamp,
            duration_ms: 0,
            custom_title: String::new(),
        }
    }

    pub fn path(&self) -> &Path {
        Path::new(&self.file_path)
    }

    pub fn has_custom_title(&self) -> bool {
        !self.custom_title.is_empty()
    }

    /// Title shown to the user: the custom title, or one derived from the
    /// creation time in the local timezone
    pub fn display_title(&self) -> String {
        if self.has_custom_title() {
            return self.custom_title.clone();
        }
        match Local.timestamp_millis_opt(self.timestamp).single() {
            Some(created) => format!("{} {}", RECORDING_WORD, created.format(DISPLAY_TITLE_FORMAT)),
            None => self.file_name.clone(),
        }
    }

    /// Copy of this record carrying a normalized custom title
    pub fn with_custom_title(&self, title: &str) -> Self {
        Self {
            custom_title: normalize_title(title).unwrap_or_default(),
            ..self.clone()
        }
    }
}

/// Reference to the image attached to a day.
///
/// Either an opaque content handle from the host (e.g. a picker URI) or an
/// absolute path to a locally cached copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        ImageRef(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of the locally cached file, if this reference points at one
    pub fn local_path(&self) -> Option<&Path> {
        let path = Path::new(&self.0);
        path.is_absolute().then_some(path)
    }

    pub fn is_local(&self) -> bool {
        self.local_path().is_some()
    }
}

/// Trim a user-entered title; whitespace-only input means "unset"
pub fn normalize_title(title: &str) -> Option<String> {
    let trimmed = title.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// The aggregate root: every per-date journaling table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingRepositoryState {
    recordings_by_date: BTreeMap<DateKey, Vec<RecordingRecord>>,
    day_titles_by_date: BTreeMap<DateKey, String>,
    special_dates: BTreeSet<DateKey>,
    image_ref_by_date: BTreeMap<DateKey, ImageRef>,
    selected_date: Option<DateKey>,
}

impl RecordingRepositoryState {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- queries ----

    pub fn recordings_by_date(&self) -> &BTreeMap<DateKey, Vec<RecordingRecord>> {
        &self.recordings_by_date
    }

    pub fn day_titles_by_date(&self) -> &BTreeMap<DateKey, String> {
        &self.day_titles_by_date
    }

    pub fn special_dates(&self) -> &BTreeSet<DateKey> {
        &self.special_dates
    }

    pub fn image_ref_by_date(&self) -> &BTreeMap<DateKey, ImageRef> {
        &self.image_ref_by_date
    }

    pub fn selected_date(&self) -> Option<DateKey> {
        self.selected_date
    }

    pub fn day_title(&self, date: &DateKey) -> Option<&str> {
        self.day_titles_by_date.get(date).map(String::as_str)
    }

    pub fn image_ref(&self, date: &DateKey) -> Option<&ImageRef> {
        self.image_ref_by_date.get(date)
    }

    pub fn is_special_date(&self, date: &DateKey) -> bool {
        self.special_dates.contains(date)
    }

    /// Recordings for a day, newest first
    pub fn recordings_for_date(&self, date: &DateKey) -> Vec<RecordingRecord> {
        let mut recordings = self
            .recordings_by_date
            .get(date)
            .cloned()
            .unwrap_or_default();
        recordings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recordings
    }

    pub fn find_recording(&self, date: &DateKey, file_path: &str) -> Option<&RecordingRecord> {
        self.recordings_by_date
            .get(date)?
            .iter()
            .find(|r| r.file_path == file_path)
    }

    /// Whether any date still tracks a recording at `file_path`
    pub fn is_path_tracked(&self, file_path: &str) -> bool {
        self.recordings_by_date
            .values()
            .flatten()
            .any(|r| r.file_path == file_path)
    }

    /// Dates that currently have at least one recording
    pub fn dates_with_recordings(&self) -> BTreeSet<DateKey> {
        self.recordings_by_date
            .iter()
            .filter(|(_, recordings)| !recordings.is_empty())
            .map(|(date, _)| *date)
            .collect()
    }

    pub fn recording_count(&self) -> usize {
        self.recordings_by_date.values().map(Vec::len).sum()
    }

    // ---- mutations ----

    /// Append a record; returns false if the date already tracks that path
    pub(crate) fn insert_recording(&mut self, date: DateKey, record: RecordingRecord) -> bool {
        let recordings = self.recordings_by_date.entry(date).or_default();
        if recordings.iter().any(|r| r.file_path == record.file_path) {
            return false;
        }
        recordings.push(record);
        true
    }

    /// Replace the custom title of a tracked record, returning the new value
    pub(crate) fn update_custom_title(
        &mut self,
        date: &DateKey,
        file_path: &str,
        title: &str,
    ) -> Option<RecordingRecord> {
        let record = self
            .recordings_by_date
            .get_mut(date)?
            .iter_mut()
            .find(|r| r.file_path == file_path)?;
        *record = record.with_custom_title(title);
        Some(record.clone())
    }

    /// Remove one record; drops the date entry once its list is empty
    pub(crate) fn remove_recording(
        &mut self,
        date: &DateKey,
        file_path: &str,
    ) -> Option<RecordingRecord> {
        let recordings = self.recordings_by_date.get_mut(date)?;
        let index = recordings.iter().position(|r| r.file_path == file_path)?;
        let removed = recordings.remove(index);
        if recordings.is_empty() {
            self.recordings_by_date.remove(date);
        }
        Some(removed)
    }

    /// Remove every record for a date
    pub(crate) fn remove_date(&mut self, date: &DateKey) -> Vec<RecordingRecord> {
        self.recordings_by_date.remove(date).unwrap_or_default()
    }

    /// Set or clear the day title; blank titles remove the entry
    pub(crate) fn set_day_title(&mut self, date: DateKey, title: &str) {
        match normalize_title(title) {
            Some(title) => {
                self.day_titles_by_date.insert(date, title);
            }
            None => {
                self.day_titles_by_date.remove(&date);
            }
        }
    }

    /// Flip the birthday mark; returns whether the date is now marked
    pub(crate) fn toggle_special_date(&mut self, date: DateKey) -> bool {
        if self.special_dates.remove(&date) {
            false
        } else {
            self.special_dates.insert(date);
            true
        }
    }

    pub(crate) fn set_image_ref(&mut self, date: DateKey, image: ImageRef) -> Option<ImageRef> {
        self.image_ref_by_date.insert(date, image)
    }

    pub(crate) fn clear_image_ref(&mut self, date: &DateKey) -> Option<ImageRef> {
        self.image_ref_by_date.remove(date)
    }

    pub(crate) fn set_selected_date(&mut self, date: Option<DateKey>) {
        self.selected_date = date;
    }

    /// Remove a record only if it is still tracked under `date`
    pub(crate) fn remove_stale_recording(&mut self, date: &DateKey, file_path: &str) -> bool {
        self.remove_recording(date, file_path).is_some()
    }

    /// Drop an image reference only if it still equals `image`
    pub(crate) fn remove_stale_image(&mut self, date: &DateKey, image: &ImageRef) -> bool {
        if self.image_ref_by_date.get(date) == Some(image) {
            self.image_ref_by_date.remove(date);
            true
        } else {
            false
        }
    }

    // ---- decode helpers ----

    pub(crate) fn replace_recordings(&mut self, recordings: BTreeMap<DateKey, Vec<RecordingRecord>>) {
        self.recordings_by_date = recordings;
        self.recordings_by_date.retain(|_, list| !list.is_empty());
    }

    pub(crate) fn replace_day_titles(&mut self, titles: BTreeMap<DateKey, String>) {
        self.day_titles_by_date = titles
            .into_iter()
            .filter_map(|(date, title)| normalize_title(&title).map(|t| (date, t)))
            .collect();
    }

    pub(crate) fn replace_special_dates(&mut self, dates: BTreeSet<DateKey>) {
        self.special_dates = dates;
    }

    pub(crate) fn replace_image_refs(&mut self, images: BTreeMap<DateKey, ImageRef>) {
        self.image_ref_by_date = images
            .into_iter()
            .filter(|(_, image)| !image.as_str().is_empty())
            .collect();
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
