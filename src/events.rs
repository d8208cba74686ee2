// Repository notifications for the controller
// Defines event payloads and emission trait for testability

use serde::Serialize;

/// Event names as constants for consistency
pub mod event_names {
    pub const RECORDINGS_CHANGED: &str = "recordings_changed";
    pub const RECONCILIATION_COMPLETED: &str = "reconciliation_completed";
    pub const DELETE_FAILED: &str = "delete_failed";
    pub const PERSIST_FAILED: &str = "persist_failed";
}

/// Payload for recordings_changed event
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordingsChangedPayload {
    /// What caused the change (e.g., "reconcile")
    pub reason: String,
    /// Date keys whose recording list changed
    pub dates: Vec<String>,
}

/// Payload for reconciliation_completed event
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationCompletedPayload {
    /// Number of recording records dropped because their file vanished
    pub removed_recordings: usize,
    /// Number of local image references dropped because their file vanished
    pub removed_images: usize,
}

/// Payload for delete_failed event
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFailedPayload {
    /// File that could not be removed
    pub file_path: String,
    /// Descriptive error message
    pub message: String,
}

/// Payload for persist_failed event
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PersistFailedPayload {
    /// Descriptive error message
    pub message: String,
}

/// Trait for emitting repository events.
///
/// Called from the background worker; host implementations are expected to
/// post the notification onto their interactive thread before touching UI.
pub trait RepositoryEventEmitter: Send + Sync {
    /// Emit recordings_changed event
    fn emit_recordings_changed(&self, payload: RecordingsChangedPayload);

    /// Emit reconciliation_completed event
    fn emit_reconciliation_completed(&self, payload: ReconciliationCompletedPayload);

    /// Emit delete_failed event
    fn emit_delete_failed(&self, payload: DeleteFailedPayload);

    /// Emit persist_failed event
    fn emit_persist_failed(&self, payload: PersistFailedPayload);
}

/// Emitter that only logs, for hosts without a notification channel
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEventEmitter;

impl RepositoryEventEmitter for LoggingEventEmitter {
    fn emit_recordings_changed(&self, payload: RecordingsChangedPayload) {
        crate::debug!(
            "{}: {} dates ({})",
            event_names::RECORDINGS_CHANGED,
            payload.dates.len(),
            payload.reason
        );
    }

    fn emit_reconciliation_completed(&self, payload: ReconciliationCompletedPayload) {
        crate::debug!(
            "{}: removed {} recordings, {} images",
            event_names::RECONCILIATION_COMPLETED,
            payload.removed_recordings,
            payload.removed_images
        );
    }

    fn emit_delete_failed(&self, payload: DeleteFailedPayload) {
        crate::warn!(
            "{}: {} ({})",
            event_names::DELETE_FAILED,
            payload.file_path,
            payload.message
        );
    }

    fn emit_persist_failed(&self, payload: PersistFailedPayload) {
        crate::error!("{}: {}", event_names::PERSIST_FAILED, payload.message);
    }
}

#[cfg(test)]
#[path = "events_test.rs"]
pub(crate) mod tests;
