// Zip export of every recording whose file still exists
//
// Entries are laid out as `<DateKey>/<file name>` so recordings from
// different days never collide. The archive is written next to the target
// and renamed into place once complete.

use super::state::RecordingRepositoryState;
use super::worker::WorkerError;
use crate::fs::FileSystem;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;

/// Default archive file name inside the data directory
pub const ARCHIVE_FILE_NAME: &str = "SayDayRecordings.zip";

/// Error types for archive export
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArchiveError {
    /// Nothing to export
    #[error("No recordings found")]
    NoRecordings,
    /// Creating or writing the archive failed
    #[error("Failed to create archive: {0}")]
    WriteFailed(String),
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// What ended up in a finished archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub file_count: usize,
}

/// Entry name and source file of everything worth exporting
fn collect_entries(
    state: &RecordingRepositoryState,
    fs: &dyn FileSystem,
) -> Vec<(String, PathBuf)> {
    let mut seen = BTreeSet::new();
    let mut entries = Vec::new();

    for (date, recordings) in state.recordings_by_date() {
        for record in recordings {
            let path = record.path();
            if !fs.exists(path) {
                continue;
            }
            let base = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| record.file_name.clone());
            let name = format!("{}/{}", date, base);
            if seen.insert(name.clone()) {
                entries.push((name, path.to_path_buf()));
            }
        }
    }
    entries
}

/// Write every existing recording into a zip at `target`
pub fn write_archive(
    state: &RecordingRepositoryState,
    fs: &dyn FileSystem,
    target: &Path,
) -> Result<ArchiveSummary, ArchiveError> {
    let entries = collect_entries(state, fs);
    if entries.is_empty() {
        return Err(ArchiveError::NoRecordings);
    }

    let temp_path = target.with_extension("zip.tmp");
    let result =
        write_entries(&temp_path, &entries).and_then(|()| std::fs::rename(&temp_path, target));
    if let Err(e) = result {
        // Best effort; the partial file is useless
        let _ = std::fs::remove_file(&temp_path);
        return Err(ArchiveError::WriteFailed(format!("{}: {}", target.display(), e)));
    }

    Ok(ArchiveSummary {
        path: target.to_path_buf(),
        file_count: entries.len(),
    })
}

fn write_entries(path: &Path, entries: &[(String, PathBuf)]) -> io::Result<()> {
    let file = File::create(path)?;
    let mut zip_writer = zip::ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default();

    for (name, source) in entries {
        zip_writer.start_file(name.as_str(), options)?;
        let mut input = File::open(source)?;
        io::copy(&mut input, &mut zip_writer)?;
    }

    let mut output = zip_writer.finish()?;
    io::Write::flush(&mut output)?;
    output.get_ref().sync_all()
}

#[cfg(test)]
#[path = "archive_test.rs"]
mod tests;
