// Filesystem reconciliation: drop metadata whose file vanished out-of-band
//
// Probing runs against a snapshot without holding the aggregate lock; the
// removals are applied afterwards by (date, path), so anything the
// controller added in the meantime survives.

use super::state::{ImageRef, RecordingRepositoryState};
use crate::date_key::DateKey;
use crate::fs::FileSystem;
use std::collections::BTreeSet;

/// References found to point at missing files
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaleReferences {
    pub recordings: Vec<(DateKey, String)>,
    pub images: Vec<(DateKey, ImageRef)>,
}

impl StaleReferences {
    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty() && self.images.is_empty()
    }
}

/// What a reconciliation pass actually removed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    pub removed_recordings: usize,
    pub removed_images: usize,
    /// Dates whose recording list changed
    pub changed_dates: BTreeSet<DateKey>,
}

impl ReconcileOutcome {
    pub fn has_drift(&self) -> bool {
        self.removed_recordings > 0 || self.removed_images > 0
    }
}

/// Find every recording, and every locally cached image, whose file is gone
pub fn scan(state: &RecordingRepositoryState, fs: &dyn FileSystem) -> StaleReferences {
    let mut stale = StaleReferences::default();

    for (date, recordings) in state.recordings_by_date() {
        for record in recordings {
            if !fs.exists(record.path()) {
                stale.recordings.push((*date, record.file_path.clone()));
            }
        }
    }

    for (date, image) in state.image_ref_by_date() {
        if let Some(path) = image.local_path() {
            if !fs.exists(path) {
                stale.images.push((*date, image.clone()));
            }
        }
    }

    stale
}

/// Remove the stale references that are still present in `state`
pub fn apply(state: &mut RecordingRepositoryState, stale: &StaleReferences) -> ReconcileOutcome {
    let mut outcome = ReconcileOutcome::default();

    for (date, file_path) in &stale.recordings {
        if state.remove_stale_recording(date, file_path) {
            outcome.removed_recordings += 1;
            outcome.changed_dates.insert(*date);
        }
    }

    for (date, image) in &stale.images {
        if state.remove_stale_image(date, image) {
            outcome.removed_images += 1;
        }
    }

    outcome
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
