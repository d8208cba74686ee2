use super::*;
use crate::date_key::DateKey;
use crate::fs::LocalFileSystem;
use crate::repository::state::RecordingRecord;
use std::io::Read;
use tempfile::TempDir;

fn date(s: &str) -> DateKey {
    DateKey::parse(s).unwrap()
}

fn entry_names(path: &Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

#[test]
fn test_empty_journal_reports_no_recordings() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join(ARCHIVE_FILE_NAME);

    let result = write_archive(&RecordingRepositoryState::new(), &LocalFileSystem, &target);

    assert_eq!(result, Err(ArchiveError::NoRecordings));
    assert!(!target.exists());
}

#[test]
fn test_only_missing_files_reports_no_recordings() {
    let temp_dir = TempDir::new().unwrap();
    let mut state = RecordingRepositoryState::new();
    state.insert_recording(
        date("2024-03-01"),
        RecordingRecord::new("/nonexistent/sayday/gone.3gp", "gone.3gp", 1),
    );

    let result = write_archive(
        &state,
        &LocalFileSystem,
        &temp_dir.path().join(ARCHIVE_FILE_NAME),
    );

    assert_eq!(result, Err(ArchiveError::NoRecordings));
}

#[test]
fn test_archive_contains_existing_recordings() {
    let temp_dir = TempDir::new().unwrap();
    let a = temp_dir.path().join("Recording_2024-03-01_09-00-00.3gp");
    let b = temp_dir.path().join("Recording_2024-05-09_18-30-00.3gp");
    std::fs::write(&a, b"first").unwrap();
    std::fs::write(&b, b"second").unwrap();

    let mut state = RecordingRepositoryState::new();
    state.insert_recording(
        date("2024-03-01"),
        RecordingRecord::new(a.to_string_lossy(), "a", 1),
    );
    state.insert_recording(
        date("2024-05-09"),
        RecordingRecord::new(b.to_string_lossy(), "b", 2),
    );
    state.insert_recording(
        date("2024-05-09"),
        RecordingRecord::new("/nonexistent/sayday/gone.3gp", "gone", 3),
    );
    let target = temp_dir.path().join(ARCHIVE_FILE_NAME);

    let summary = write_archive(&state, &LocalFileSystem, &target).unwrap();

    assert_eq!(summary.path, target);
    assert_eq!(summary.file_count, 2);
    assert_eq!(
        entry_names(&target),
        vec![
            "2024-03-01/Recording_2024-03-01_09-00-00.3gp".to_string(),
            "2024-05-09/Recording_2024-05-09_18-30-00.3gp".to_string(),
        ]
    );

    let mut archive = zip::ZipArchive::new(File::open(&target).unwrap()).unwrap();
    let mut contents = String::new();
    archive
        .by_name("2024-05-09/Recording_2024-05-09_18-30-00.3gp")
        .unwrap()
        .read_to_string(&mut contents)
        .unwrap();
    assert_eq!(contents, "second");
    assert!(!target.with_extension("zip.tmp").exists());
}

#[test]
fn test_archive_replaces_previous_export() {
    let temp_dir = TempDir::new().unwrap();
    let a = temp_dir.path().join("a.3gp");
    std::fs::write(&a, b"audio").unwrap();
    let target = temp_dir.path().join(ARCHIVE_FILE_NAME);
    std::fs::write(&target, b"stale export").unwrap();

    let mut state = RecordingRepositoryState::new();
    state.insert_recording(
        date("2024-03-01"),
        RecordingRecord::new(a.to_string_lossy(), "a.3gp", 1),
    );

    write_archive(&state, &LocalFileSystem, &target).unwrap();

    assert_eq!(entry_names(&target), vec!["2024-03-01/a.3gp".to_string()]);
}

#[test]
fn test_unwritable_target_fails() {
    let temp_dir = TempDir::new().unwrap();
    let a = temp_dir.path().join("a.3gp");
    std::fs::write(&a, b"audio").unwrap();
    let mut state = RecordingRepositoryState::new();
    state.insert_recording(
        date("2024-03-01"),
        RecordingRecord::new(a.to_string_lossy(), "a.3gp", 1),
    );

    let target = temp_dir.path().join("missing-dir").join(ARCHIVE_FILE_NAME);
    let result = write_archive(&state, &LocalFileSystem, &target);

    assert!(matches!(result, Err(ArchiveError::WriteFailed(_))));
}
