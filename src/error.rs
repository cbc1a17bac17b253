use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeeperError {
    #[error("data directory not found: {0}")]
    DataDirMissing(PathBuf),
    #[error("manifest {path} is not a JSON array of objects: {reason}")]
    InvalidManifest { path: PathBuf, reason: String },
    #[error("refusing to overwrite {path}: {reason}")]
    UnsafeOverwrite { path: PathBuf, reason: String },
    #[error("failed to back up {path}: {source}")]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path} (restored: {restored}; backup kept at {backup:?}): {reason}")]
    WriteFailed {
        path: PathBuf,
        backup: Option<PathBuf>,
        restored: bool,
        reason: String,
    },
    #[error("version history unavailable: {0}")]
    HistoryUnavailable(String),
    #[error("revision not found in recent history: {0}")]
    RevisionNotFound(String),
    #[error("revision `{prefix}` is ambiguous; matches {}", .candidates.join(", "))]
    AmbiguousRevision {
        prefix: String,
        candidates: Vec<String>,
    },
    #[error("no previous revision to roll back to")]
    NoPreviousRevision,
}
