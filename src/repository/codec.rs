// JSON encoding of the aggregate into store tables
// Each table decodes independently: a corrupt title table must not stop
// recordings from loading.

use super::state::{ImageRef, RecordingRecord, RecordingRepositoryState};
use crate::date_key::DateKey;
use crate::store::{keys, KeyValueStore, WriteBatch};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};

/// A table that could not be decoded and was reset to empty
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Failed to decode {table}: {message}")]
pub struct DecodeFailure {
    /// Store key of the table
    pub table: &'static str,
    /// Parser or read error
    pub message: String,
}

/// Result of decoding every table
#[derive(Debug, Default)]
pub struct Decoded {
    pub state: RecordingRepositoryState,
    pub failures: Vec<DecodeFailure>,
}

/// Encode the full aggregate as one batch covering every table
pub fn encode(state: &RecordingRepositoryState) -> Result<WriteBatch, serde_json::Error> {
    let recordings = serde_json::to_string(state.recordings_by_date())?;
    let titles = serde_json::to_string(state.day_titles_by_date())?;
    let bdays = serde_json::to_string(state.special_dates())?;
    let images = serde_json::to_string(state.image_ref_by_date())?;
    let selected = state
        .selected_date()
        .map(|d| d.to_string())
        .unwrap_or_default();

    Ok(WriteBatch::new()
        .put(keys::RECORDINGS, recordings)
        .put(keys::DAY_TITLES, titles)
        .put(keys::SELECTED_DATE, selected)
        .put(keys::BDAY_DATES, bdays)
        .put(keys::IMAGE_URIS, images))
}

/// Read and decode every table, resetting the ones that fail
pub fn decode(store: &dyn KeyValueStore) -> Decoded {
    let mut decoded = Decoded::default();

    match read_table::<BTreeMap<String, Vec<RecordingRecord>>>(store, keys::RECORDINGS, "{}") {
        Ok(raw) => {
            let recordings = canonical_keys(keys::RECORDINGS, raw)
                .into_iter()
                .map(|(date, list)| (date, dedup_by_path(list)))
                .collect();
            decoded.state.replace_recordings(recordings);
        }
        Err(failure) => decoded.failures.push(failure),
    }

    match read_table::<BTreeMap<String, String>>(store, keys::DAY_TITLES, "{}") {
        Ok(raw) => decoded
            .state
            .replace_day_titles(canonical_keys(keys::DAY_TITLES, raw)),
        Err(failure) => decoded.failures.push(failure),
    }

    match read_table::<Vec<String>>(store, keys::BDAY_DATES, "[]") {
        Ok(raw) => {
            let dates: BTreeSet<DateKey> = raw
                .iter()
                .filter_map(|s| parse_key(keys::BDAY_DATES, s))
                .collect();
            decoded.state.replace_special_dates(dates);
        }
        Err(failure) => decoded.failures.push(failure),
    }

    match read_table::<BTreeMap<String, ImageRef>>(store, keys::IMAGE_URIS, "{}") {
        Ok(raw) => decoded
            .state
            .replace_image_refs(canonical_keys(keys::IMAGE_URIS, raw)),
        Err(failure) => decoded.failures.push(failure),
    }

    match store.get(keys::SELECTED_DATE) {
        Ok(Some(value)) if !value.is_empty() => {
            let selected = parse_key(keys::SELECTED_DATE, &value);
            decoded.state.set_selected_date(selected);
        }
        Ok(_) => {}
        Err(e) => decoded.failures.push(DecodeFailure {
            table: keys::SELECTED_DATE,
            message: e.to_string(),
        }),
    }

    for failure in &decoded.failures {
        crate::warn!("{}; starting that table empty", failure);
    }
    decoded
}

fn read_table<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    table: &'static str,
    default: &str,
) -> Result<T, DecodeFailure> {
    let raw = store
        .get(table)
        .map_err(|e| DecodeFailure {
            table,
            message: e.to_string(),
        })?
        .unwrap_or_else(|| default.to_string());

    serde_json::from_str(&raw).map_err(|e| DecodeFailure {
        table,
        message: e.to_string(),
    })
}

fn parse_key(table: &str, raw: &str) -> Option<DateKey> {
    match DateKey::parse(raw) {
        Ok(date) => Some(date),
        Err(e) => {
            crate::warn!("Dropping {} entry: {}", table, e);
            None
        }
    }
}

fn canonical_keys<V>(table: &str, raw: BTreeMap<String, V>) -> BTreeMap<DateKey, V> {
    raw.into_iter()
        .filter_map(|(key, value)| parse_key(table, &key).map(|date| (date, value)))
        .collect()
}

/// Keep the first record for each path
fn dedup_by_path(records: Vec<RecordingRecord>) -> Vec<RecordingRecord> {
    let mut seen = BTreeSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.file_path.clone()))
        .collect()
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod tests;
