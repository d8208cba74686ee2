use super::*;
use crate::date_key::DateKey;
use crate::events::tests::MockEventEmitter;
use crate::fs::tests::FlakyFileSystem;
use crate::fs::LocalFileSystem;
use crate::repository::state::RecordingRecord;
use crate::store::{keys, MemoryStore, StoreError, WriteBatch};
use tempfile::TempDir;

struct Fixture {
    state: Arc<RwLock<RecordingRepositoryState>>,
    store: Arc<MemoryStore>,
    emitter: Arc<MockEventEmitter>,
    worker: PersistWorkerHandle,
}

fn fixture_with_fs(fs: Arc<dyn FileSystem>) -> Fixture {
    let state = Arc::new(RwLock::new(RecordingRepositoryState::new()));
    let store = Arc::new(MemoryStore::new());
    let emitter = Arc::new(MockEventEmitter::new());
    let worker = PersistWorkerHandle::spawn(WorkerContext {
        state: state.clone(),
        store: store.clone(),
        fs,
        emitter: emitter.clone(),
    });
    Fixture {
        state,
        store,
        emitter,
        worker,
    }
}

fn fixture() -> Fixture {
    fixture_with_fs(Arc::new(LocalFileSystem))
}

fn date(s: &str) -> DateKey {
    DateKey::parse(s).unwrap()
}

fn stored_state(store: &MemoryStore) -> RecordingRepositoryState {
    codec::decode(store).state
}

#[test]
fn test_worker_handle_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<PersistWorkerHandle>();
}

#[test]
fn test_spawn_and_drop() {
    let fx = fixture();
    drop(fx.worker);
    // If we get here without hanging, the Drop impl worked correctly
}

#[test]
fn test_persist_writes_current_aggregate() {
    let fx = fixture();
    fx.state.write().insert_recording(
        date("2024-03-01"),
        RecordingRecord::new("/data/a.3gp", "a.3gp", 1000),
    );

    fx.worker.persist().unwrap();
    fx.worker.flush().unwrap();

    assert_eq!(stored_state(&fx.store), *fx.state.read());
}

#[test]
fn test_back_to_back_persists_reflect_latest_state() {
    let fx = fixture();

    fx.state.write().set_day_title(date("2024-03-01"), "first");
    fx.worker.persist().unwrap();
    fx.state.write().set_day_title(date("2024-03-01"), "second");
    fx.worker.persist().unwrap();
    fx.worker.flush().unwrap();

    let stored = stored_state(&fx.store);
    assert_eq!(stored.day_title(&date("2024-03-01")), Some("second"));
}

#[test]
fn test_drop_drains_pending_jobs() {
    let fx = fixture();
    fx.state.write().toggle_special_date(date("2024-05-09"));
    fx.worker.persist().unwrap();

    let store = fx.store.clone();
    drop(fx.worker);

    assert!(stored_state(&store).is_special_date(&date("2024-05-09")));
}

#[test]
fn test_reconcile_removes_missing_and_persists() {
    let temp_dir = TempDir::new().unwrap();
    let kept = temp_dir.path().join("kept.3gp");
    std::fs::write(&kept, b"audio").unwrap();
    let gone = temp_dir.path().join("gone.3gp");

    let fx = fixture();
    {
        let mut state = fx.state.write();
        state.insert_recording(
            date("2024-03-01"),
            RecordingRecord::new(kept.to_string_lossy(), "kept.3gp", 1),
        );
        state.insert_recording(
            date("2024-03-02"),
            RecordingRecord::new(gone.to_string_lossy(), "gone.3gp", 2),
        );
    }

    fx.worker.reconcile().unwrap();
    fx.worker.flush().unwrap();

    let state = fx.state.read().clone();
    assert_eq!(state.recording_count(), 1);
    assert_eq!(stored_state(&fx.store), state);

    let reconciled = fx.emitter.reconciled_events.lock().unwrap();
    assert_eq!(reconciled.len(), 1);
    assert_eq!(reconciled[0].removed_recordings, 1);
    let changed = fx.emitter.changed_events.lock().unwrap();
    assert_eq!(changed[0].dates, vec!["2024-03-02".to_string()]);
}

#[test]
fn test_reconcile_without_drift_emits_no_change() {
    let fx = fixture();
    fx.worker.reconcile().unwrap();
    fx.worker.flush().unwrap();

    assert!(fx.emitter.changed_events.lock().unwrap().is_empty());
    assert_eq!(fx.emitter.reconciled_events.lock().unwrap().len(), 1);
}

#[test]
fn test_delete_files_reports_failures() {
    let temp_dir = TempDir::new().unwrap();
    let ok_path = temp_dir.path().join("ok.3gp");
    let stuck_path = temp_dir.path().join("stuck.3gp");
    std::fs::write(&ok_path, b"audio").unwrap();
    std::fs::write(&stuck_path, b"audio").unwrap();

    let fs = Arc::new(FlakyFileSystem::new());
    fs.fail_delete_of(&stuck_path);
    let fx = fixture_with_fs(fs.clone());

    let response = fx
        .worker
        .delete_files(vec![ok_path.clone(), stuck_path.clone()])
        .unwrap();
    let failures = match response.blocking_recv().unwrap() {
        Err(DeletionError::Failed(failures)) => failures,
        other => panic!("expected delete failures, got {:?}", other),
    };

    assert!(!ok_path.exists());
    assert!(stuck_path.exists());
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].path, stuck_path.display().to_string());
    assert_eq!(fx.emitter.delete_failed_events.lock().unwrap().len(), 1);
    assert_eq!(fs.delete_calls.lock().len(), 2);
}

/// Store that rejects every write
struct ReadOnlyStore;

impl KeyValueStore for ReadOnlyStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    fn apply(&self, _batch: WriteBatch) -> Result<(), StoreError> {
        Err(StoreError::PersistenceError("read-only".to_string()))
    }
}

#[test]
fn test_persist_failure_is_emitted_not_raised() {
    let state = Arc::new(RwLock::new(RecordingRepositoryState::new()));
    let emitter = Arc::new(MockEventEmitter::new());
    let worker = PersistWorkerHandle::spawn(WorkerContext {
        state,
        store: Arc::new(ReadOnlyStore),
        fs: Arc::new(LocalFileSystem),
        emitter: emitter.clone(),
    });

    worker.persist().unwrap();
    worker.flush().unwrap();

    let failures = emitter.persist_failed_events.lock().unwrap();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].message.contains("read-only"));
}

#[test]
fn test_commands_after_shutdown_fail() {
    let fx = fixture();
    fx.worker.send(WorkerCommand::Shutdown).unwrap();

    // Queued behind the shutdown, so it is discarded with the channel
    assert_eq!(fx.worker.flush(), Err(WorkerError::ThreadDisconnected));
    assert_eq!(fx.worker.persist(), Err(WorkerError::ThreadDisconnected));
    assert!(fx.store.get(keys::RECORDINGS).unwrap().is_none());
}

#[test]
fn test_delete_files_succeeds_when_all_removed() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("a.3gp");
    std::fs::write(&path, b"audio").unwrap();
    let fx = fixture();

    let response = fx.worker.delete_files(vec![path.clone()]).unwrap();

    assert_eq!(response.blocking_recv().unwrap(), Ok(()));
    assert!(!path.exists());
}

#[test]
fn test_delete_image_skips_path_attached_again() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("2024-03-01.jpg");
    std::fs::write(&path, b"jpeg").unwrap();
    let fx = fixture();

    fx.worker.delete_image(path.clone()).unwrap();
    fx.worker.flush().unwrap();
    assert!(!path.exists());

    std::fs::write(&path, b"jpeg").unwrap();
    fx.state
        .write()
        .set_image_ref(date("2024-03-01"), ImageRef::new(path.to_string_lossy()));
    fx.worker.delete_image(path.clone()).unwrap();
    fx.worker.flush().unwrap();

    assert!(path.exists());
}

#[test]
fn test_cache_image_attaches_and_persists() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("picked.jpg");
    let target = temp_dir.path().join("2024-03-01.jpg");
    std::fs::write(&source, b"jpeg").unwrap();
    let fx = fixture();

    let response = fx
        .worker
        .cache_image(date("2024-03-01"), source.clone(), target.clone())
        .unwrap();
    let image = response.blocking_recv().unwrap().unwrap();

    assert_eq!(image.local_path(), Some(target.as_path()));
    assert_eq!(std::fs::read(&target).unwrap(), b"jpeg");
    assert_eq!(fx.state.read().image_ref(&date("2024-03-01")), Some(&image));
    assert_eq!(
        stored_state(&fx.store).image_ref(&date("2024-03-01")),
        Some(&image)
    );
}

#[test]
fn test_cache_image_replaces_previous_cached_file() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("picked.jpg");
    let old = temp_dir.path().join("old.jpg");
    let target = temp_dir.path().join("2024-03-01.jpg");
    std::fs::write(&source, b"jpeg").unwrap();
    std::fs::write(&old, b"old").unwrap();
    let fx = fixture();
    fx.state
        .write()
        .set_image_ref(date("2024-03-01"), ImageRef::new(old.to_string_lossy()));

    let response = fx
        .worker
        .cache_image(date("2024-03-01"), source, target.clone())
        .unwrap();
    response.blocking_recv().unwrap().unwrap();

    assert!(!old.exists());
    assert!(target.exists());
}

#[test]
fn test_cache_image_copy_failure_leaves_state_alone() {
    let temp_dir = TempDir::new().unwrap();
    let fx = fixture();

    let response = fx
        .worker
        .cache_image(
            date("2024-03-01"),
            temp_dir.path().join("missing.jpg"),
            temp_dir.path().join("2024-03-01.jpg"),
        )
        .unwrap();

    assert!(matches!(
        response.blocking_recv().unwrap(),
        Err(ImageCacheError::CopyFailed(_))
    ));
    assert!(fx.state.read().image_ref(&date("2024-03-01")).is_none());
}

#[test]
fn test_export_archive_runs_on_worker() {
    let temp_dir = TempDir::new().unwrap();
    let recording = temp_dir.path().join("a.3gp");
    std::fs::write(&recording, b"audio").unwrap();
    let fx = fixture();
    fx.state.write().insert_recording(
        date("2024-03-01"),
        RecordingRecord::new(recording.to_string_lossy(), "a.3gp", 1),
    );
    let target = temp_dir.path().join(archive::ARCHIVE_FILE_NAME);

    let response = fx.worker.export_archive(target.clone()).unwrap();
    let summary = response.blocking_recv().unwrap().unwrap();

    assert_eq!(summary.file_count, 1);
    assert!(target.exists());
}
