//! Recording directory layout
//!
//! Every capture lives in a directory named `recording_{identifier}_{timestamp}`.
//! Streams that belong to one synchronized capture share the timestamp, so a
//! stream's directory can be located from its parent capture's directory by
//! matching the suffix.

use std::path::{Path, PathBuf};

use crate::error::{ReplayError, Result};
use crate::store::WriterClaim;

/// Prefix shared by every recording directory
pub const RECORDING_DIR_PREFIX: &str = "recording";

/// Timestamp format used in directory names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Directory name for a capture
pub fn recording_dir_name(identifier: &str, timestamp: &str) -> String {
    format!("{}_{}_{}", RECORDING_DIR_PREFIX, identifier, timestamp)
}

/// Current local time formatted for a directory name
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Timestamp suffix of a recording directory (text after the last `_`)
pub fn timestamp_of(dir: &Path) -> Option<&str> {
    let name = dir.file_name()?.to_str()?;
    let (_, suffix) = name.rsplit_once('_')?;
    (!suffix.is_empty()).then_some(suffix)
}

/// Directory of a child stream inside a synchronized capture
pub fn child_directory(parent_dir: &Path, child_identifier: &str) -> Option<PathBuf> {
    let timestamp = timestamp_of(parent_dir)?;
    Some(parent_dir.join(recording_dir_name(child_identifier, timestamp)))
}

/// Where a recording directory is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySpec {
    /// Directory the recording directory is created in
    pub base_dir: PathBuf,
    /// Timestamp suffix, shared by all streams of one capture
    pub timestamp: String,
}

impl DirectorySpec {
    pub fn new(base_dir: impl Into<PathBuf>, timestamp: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Spec stamped with the current local time
    pub fn now(base_dir: impl Into<PathBuf>) -> Self {
        Self::new(base_dir, timestamp_now())
    }

    /// Full path of the recording directory for `identifier`
    pub fn directory_for(&self, identifier: &str) -> PathBuf {
        self.base_dir
            .join(recording_dir_name(identifier, &self.timestamp))
    }
}

fn matches_identifier(name: &str, identifier: &str) -> bool {
    let Some(rest) = name
        .strip_prefix(RECORDING_DIR_PREFIX)
        .and_then(|r| r.strip_prefix('_'))
        .and_then(|r| r.strip_prefix(identifier))
        .and_then(|r| r.strip_prefix('_'))
    else {
        return false;
    };
    !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit())
}

/// All recording directories for `identifier` under `base_dir`, oldest first
pub fn find_recordings(base_dir: &Path, identifier: &str) -> Result<Vec<PathBuf>> {
    if !base_dir.exists() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in std::fs::read_dir(base_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if name
            .to_str()
            .is_some_and(|n| matches_identifier(n, identifier))
        {
            found.push(entry.path());
        }
    }

    // Fixed-width timestamps sort chronologically as strings
    found.sort_by(|a, b| timestamp_of(a).cmp(&timestamp_of(b)));
    Ok(found)
}

/// Most recent recording directory for `identifier`
pub fn latest_recording(base_dir: &Path, identifier: &str) -> Result<Option<PathBuf>> {
    Ok(find_recordings(base_dir, identifier)?.pop())
}

/// Outcome of a bulk directory deletion
#[derive(Debug, Default)]
pub struct DeleteReport {
    /// Directories that were removed
    pub deleted: Vec<PathBuf>,
    /// Directories that could not be removed, with the reason
    pub failed: Vec<(PathBuf, ReplayError)>,
}

impl DeleteReport {
    /// Whether every matching directory was removed
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delete every recording directory for `identifier` under `base_dir`
///
/// Each directory is handled on its own: a directory with an active writer or
/// an I/O failure is reported in [`DeleteReport::failed`] and the remaining
/// directories are still removed.
pub fn delete_recordings(base_dir: &Path, identifier: &str) -> Result<DeleteReport> {
    let mut report = DeleteReport::default();

    for dir in find_recordings(base_dir, identifier)? {
        if WriterClaim::is_held(&dir) {
            tracing::error!("Refusing to delete {:?}: recording in progress", dir);
            report.failed.push((dir.clone(), ReplayError::directory_in_use(dir)));
            continue;
        }

        match std::fs::remove_dir_all(&dir) {
            Ok(()) => {
                tracing::debug!("Deleted recording directory {:?}", dir);
                report.deleted.push(dir);
            }
            Err(e) => {
                tracing::error!("Error deleting recording directory {:?}: {}", dir, e);
                report.failed.push((dir, ReplayError::Io(e)));
            }
        }
    }

    tracing::info!(
        "Deleted {} recording(s) for {} ({} failed)",
        report.deleted.len(),
        identifier,
        report.failed.len()
    );
    Ok(report)
}
