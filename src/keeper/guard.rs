//! Guarded manifest writes: serialize and re-parse, back up the current file,
//! write atomically, verify, restore on failure, commit, then drop the backup.

use crate::error::KeeperError;
use crate::keeper::history::HistoryClient;
use crate::keeper::util::backup_stamp;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub trait ManifestWriter {
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
}

/// Temp file in the target directory, fsync, rename over the target.
pub struct AtomicWriter;

impl ManifestWriter for AtomicWriter {
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|err| err.error)?;
        Ok(())
    }
}

pub fn backup_path_for(path: &Path, stamp: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = path.with_file_name(format!("{name}.backup_{stamp}"));
    if !base.exists() {
        return base;
    }
    let mut n = 1u32;
    loop {
        let candidate = path.with_file_name(format!("{name}.backup_{stamp}_{n}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// A copy of the manifest taken before a write. If neither [`release`] nor
/// [`restore`] runs, dropping the guard puts the copy back.
///
/// [`release`]: ManifestBackup::release
/// [`restore`]: ManifestBackup::restore
#[derive(Debug)]
pub struct ManifestBackup {
    original: PathBuf,
    backup: PathBuf,
    settled: bool,
}

impl ManifestBackup {
    /// `Ok(None)` when there is no current file to protect.
    pub fn create(path: &Path) -> Result<Option<Self>, KeeperError> {
        if !path.exists() {
            return Ok(None);
        }
        let backup = backup_path_for(path, &backup_stamp());
        fs::copy(path, &backup).map_err(|source| KeeperError::BackupFailed {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(file = %path.display(), backup = %backup.display(), "created backup");
        Ok(Some(Self {
            original: path.to_path_buf(),
            backup,
            settled: false,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.backup
    }

    /// The write succeeded; remove the copy.
    pub fn release(mut self) -> io::Result<()> {
        self.settled = true;
        fs::remove_file(&self.backup)
    }

    /// Copy the backup over the manifest. The backup file itself is kept and
    /// its path returned.
    pub fn restore(mut self) -> io::Result<PathBuf> {
        self.settled = true;
        fs::copy(&self.backup, &self.original)?;
        Ok(self.backup.clone())
    }
}

impl Drop for ManifestBackup {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        match fs::copy(&self.backup, &self.original) {
            Ok(_) => tracing::warn!(
                file = %self.original.display(),
                backup = %self.backup.display(),
                "write interrupted; manifest restored from backup"
            ),
            Err(err) => tracing::error!(
                file = %self.original.display(),
                backup = %self.backup.display(),
                error = %err,
                "write interrupted and restore failed"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub path: PathBuf,
    pub created: bool,
    pub committed: bool,
    /// Why the history commit was skipped or failed, when a message was given.
    pub commit_note: Option<String>,
}

/// Pretty JSON with a trailing newline, confirmed to parse back to the same
/// document.
pub fn serialize_document(document: &Value, path: &Path) -> Result<Vec<u8>, KeeperError> {
    let invalid = |reason: String| KeeperError::InvalidManifest {
        path: path.to_path_buf(),
        reason,
    };
    let mut text = serde_json::to_string_pretty(document).map_err(|err| invalid(err.to_string()))?;
    let reparsed: Value = serde_json::from_str(&text).map_err(|err| invalid(err.to_string()))?;
    if &reparsed != document {
        return Err(invalid("serialized form does not round-trip".to_string()));
    }
    text.push('\n');
    Ok(text.into_bytes())
}

fn digest(bytes: &[u8]) -> Vec<u8> {
    Sha256::digest(bytes).to_vec()
}

fn write_and_verify(
    writer: &dyn ManifestWriter,
    path: &Path,
    bytes: &[u8],
) -> Result<(), String> {
    writer.write(path, bytes).map_err(|err| err.to_string())?;
    let written = fs::read(path).map_err(|err| format!("read-back failed: {err}"))?;
    if digest(&written) != digest(bytes) {
        return Err("read-back digest does not match written content".to_string());
    }
    Ok(())
}

/// Back up, write, verify and commit `bytes` as the new content of `path`.
pub fn persist_raw(
    path: &Path,
    bytes: &[u8],
    message: Option<&str>,
    writer: &dyn ManifestWriter,
    history: &dyn HistoryClient,
) -> Result<SaveOutcome, KeeperError> {
    let created = !path.exists();
    let backup = ManifestBackup::create(path)?;

    if let Err(reason) = write_and_verify(writer, path, bytes) {
        let (backup_path, restored) = match backup {
            Some(guard) => {
                let kept = guard.path().to_path_buf();
                match guard.restore() {
                    Ok(_) => (Some(kept), true),
                    Err(err) => {
                        tracing::error!(file = %path.display(), error = %err, "restore failed");
                        (Some(kept), false)
                    }
                }
            }
            None => {
                let restored = match fs::remove_file(path) {
                    Ok(()) => true,
                    Err(err) => err.kind() == io::ErrorKind::NotFound,
                };
                (None, restored)
            }
        };
        tracing::error!(
            file = %path.display(),
            reason = %reason,
            restored,
            "manifest write failed"
        );
        return Err(KeeperError::WriteFailed {
            path: path.to_path_buf(),
            backup: backup_path,
            restored,
            reason,
        });
    }

    let mut committed = false;
    let mut commit_note = None;
    if let Some(message) = message {
        if history.is_available() {
            match history.commit(message) {
                Ok(true) => committed = true,
                Ok(false) => commit_note = Some("nothing to commit".to_string()),
                Err(err) => {
                    tracing::warn!(file = %path.display(), error = %err, "commit failed");
                    commit_note = Some(format!("commit failed: {err}"));
                }
            }
        } else {
            commit_note = Some("version history unavailable; backup-only".to_string());
        }
    }

    if let Some(guard) = backup {
        let kept = guard.path().to_path_buf();
        if let Err(err) = guard.release() {
            tracing::warn!(backup = %kept.display(), error = %err, "failed to remove backup");
        }
    }

    tracing::info!(file = %path.display(), bytes = bytes.len(), committed, "manifest saved");
    Ok(SaveOutcome {
        path: path.to_path_buf(),
        created,
        committed,
        commit_note,
    })
}

pub fn persist_document(
    path: &Path,
    document: &Value,
    message: Option<&str>,
    writer: &dyn ManifestWriter,
    history: &dyn HistoryClient,
) -> Result<SaveOutcome, KeeperError> {
    let bytes = serialize_document(document, path)?;
    persist_raw(path, &bytes, message, writer, history)
}

/// Backup files next to `path`, newest first.
pub fn list_backups(path: &Path) -> Vec<PathBuf> {
    let Some(dir) = path.parent() else {
        return Vec::new();
    };
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Vec::new();
    };
    let prefix = format!("{name}.backup_");
    let Ok(read_dir) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut out = read_dir
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix))
        })
        .collect::<Vec<_>>();
    out.sort();
    out.reverse();
    out
}
