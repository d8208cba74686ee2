// Filesystem access used by the repository and its worker
// Abstracted so tests can simulate deletes that fail or files that vanish.

use std::io::{self, ErrorKind};
use std::path::Path;

/// Error from a physical file deletion
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Failed to delete {path}: {message}")]
pub struct DeleteError {
    /// Path that could not be removed
    pub path: String,
    /// Underlying failure description
    pub message: String,
}

/// Filesystem operations the journal core depends on
pub trait FileSystem: Send + Sync {
    /// Whether a file currently exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Remove the file at `path`. Removing a file that is already gone succeeds.
    fn delete(&self, path: &Path) -> Result<(), DeleteError>;

    /// Length in bytes, `None` when the file does not exist or is unreadable
    fn length(&self, path: &Path) -> Option<u64>;

    /// Copy `source` over `target`, returning the number of bytes written
    fn copy(&self, source: &Path, target: &Path) -> io::Result<u64>;
}

/// Real filesystem backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn delete(&self, path: &Path) -> Result<(), DeleteError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DeleteError {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn length(&self, path: &Path) -> Option<u64> {
        std::fs::metadata(path)
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len())
    }

    fn copy(&self, source: &Path, target: &Path) -> io::Result<u64> {
        std::fs::copy(source, target)
    }
}

#[cfg(test)]
#[path = "fs_test.rs"]
pub(crate) mod tests;
