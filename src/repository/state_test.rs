use super::*;

fn date(s: &str) -> DateKey {
    DateKey::parse(s).unwrap()
}

fn record(path: &str, timestamp: i64) -> RecordingRecord {
    RecordingRecord::new(path, path.trim_start_matches("/data/"), timestamp)
}

#[test]
fn test_recordings_for_date_newest_first() {
    let mut state = RecordingRepositoryState::new();
    let day = date("2024-03-01");
    state.insert_recording(day, record("/data/a.3gp", 1000));
    state.insert_recording(day, record("/data/c.3gp", 3000));
    state.insert_recording(day, record("/data/b.3gp", 2000));

    let ordered: Vec<i64> = state
        .recordings_for_date(&day)
        .iter()
        .map(|r| r.timestamp)
        .collect();
    assert_eq!(ordered, vec![3000, 2000, 1000]);

    // Stored order is untouched
    assert_eq!(state.recordings_by_date()[&day][0].timestamp, 1000);
}

#[test]
fn test_insert_rejects_duplicate_path_for_same_date() {
    let mut state = RecordingRepositoryState::new();
    let day = date("2024-03-01");

    assert!(state.insert_recording(day, record("/data/a.3gp", 1)));
    assert!(!state.insert_recording(day, record("/data/a.3gp", 2)));
    assert_eq!(state.recording_count(), 1);

    // Same path under a different date is a separate entry
    assert!(state.insert_recording(date("2024-03-02"), record("/data/a.3gp", 3)));
}

#[test]
fn test_removing_last_record_drops_date_key() {
    let mut state = RecordingRepositoryState::new();
    let day = date("2024-05-09");
    state.insert_recording(day, record("/data/only.3gp", 1));

    let removed = state.remove_recording(&day, "/data/only.3gp");
    assert!(removed.is_some());
    assert!(!state.recordings_by_date().contains_key(&day));
    assert!(state.dates_with_recordings().is_empty());

    // Second removal is a no-op
    assert!(state.remove_recording(&day, "/data/only.3gp").is_none());
}

#[test]
fn test_day_title_whitespace_collapses_to_absent() {
    let mut state = RecordingRepositoryState::new();
    let day = date("2024-05-09");

    state.set_day_title(day, "  Birthday party  ");
    assert_eq!(state.day_title(&day), Some("Birthday party"));

    state.set_day_title(day, "   ");
    assert_eq!(state.day_title(&day), None);
    assert!(state.day_titles_by_date().is_empty());
}

#[test]
fn test_custom_title_update_returns_new_value() {
    let mut state = RecordingRepositoryState::new();
    let day = date("2024-03-01");
    state.insert_recording(day, record("/data/a.3gp", 1));

    let updated = state
        .update_custom_title(&day, "/data/a.3gp", " Morning ")
        .unwrap();
    assert_eq!(updated.custom_title, "Morning");
    assert!(updated.has_custom_title());

    let cleared = state.update_custom_title(&day, "/data/a.3gp", "\t").unwrap();
    assert_eq!(cleared.custom_title, "");

    assert!(state.update_custom_title(&day, "/data/zzz.3gp", "x").is_none());
}

#[test]
fn test_display_title_prefers_custom_title() {
    let rec = record("/data/a.3gp", 0).with_custom_title("Walk");
    assert_eq!(rec.display_title(), "Walk");

    let derived = record("/data/a.3gp", 1_709_251_200_000).display_title();
    assert!(derived.starts_with("Recording "));
    assert!(derived.contains("2024"));
}

#[test]
fn test_toggle_special_date() {
    let mut state = RecordingRepositoryState::new();
    let day = date("2024-05-09");

    assert!(state.toggle_special_date(day));
    assert!(state.is_special_date(&day));
    assert!(!state.toggle_special_date(day));
    assert!(!state.is_special_date(&day));
}

#[test]
fn test_image_ref_locality() {
    assert!(ImageRef::new("/data/images/image_2024-05-09.jpg").is_local());
    assert!(!ImageRef::new("content://media/external/images/42").is_local());
}

#[test]
fn test_remove_stale_image_only_matches_same_reference() {
    let mut state = RecordingRepositoryState::new();
    let day = date("2024-05-09");
    let old = ImageRef::new("/data/images/old.jpg");
    let new = ImageRef::new("/data/images/new.jpg");

    state.set_image_ref(day, new.clone());
    assert!(!state.remove_stale_image(&day, &old));
    assert_eq!(state.image_ref(&day), Some(&new));

    assert!(state.remove_stale_image(&day, &new));
    assert!(state.image_ref(&day).is_none());
}

#[test]
fn test_replace_recordings_drops_empty_lists() {
    let mut state = RecordingRepositoryState::new();
    let mut recordings = BTreeMap::new();
    recordings.insert(date("2024-01-01"), Vec::new());
    recordings.insert(date("2024-01-02"), vec![record("/data/a.3gp", 1)]);

    state.replace_recordings(recordings);
    assert_eq!(state.recordings_by_date().len(), 1);
    assert!(state.dates_with_recordings().contains(&date("2024-01-02")));
}

#[test]
fn test_path_tracked_across_dates() {
    let mut state = RecordingRepositoryState::new();
    state.insert_recording(date("2024-03-01"), record("/r/shared.3gp", 1));
    state.insert_recording(date("2024-03-02"), record("/r/shared.3gp", 2));

    state.remove_recording(&date("2024-03-01"), "/r/shared.3gp");
    assert!(state.is_path_tracked("/r/shared.3gp"));

    state.remove_recording(&date("2024-03-02"), "/r/shared.3gp");
    assert!(!state.is_path_tracked("/r/shared.3gp"));
}
