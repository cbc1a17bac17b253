use crate::keeper::paths::KeeperPaths;
use crate::keeper::util::now_rfc3339;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub at: String,
    pub command: String,
    pub status: String,
    pub message: String,
}

pub fn append_event(paths: &KeeperPaths, command: &str, status: &str, message: &str) -> Result<()> {
    fs::create_dir_all(&paths.logs_dir)
        .with_context(|| format!("failed to create {}", paths.logs_dir.display()))?;
    let event = AuditEvent {
        at: now_rfc3339(),
        command: command.to_string(),
        status: status.to_string(),
        message: message.to_string(),
    };

    let line = format!("{}\n", serde_json::to_string(&event)?);
    let path = paths.logs_dir.join("audit.log");
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

/// Audit is best effort; failures only reach the log.
pub fn record(paths: &KeeperPaths, command: &str, status: &str, message: &str) {
    if let Err(err) = append_event(paths, command, status, message) {
        tracing::warn!(command, error = %format!("{err:#}"), "failed to append audit event");
    }
}
