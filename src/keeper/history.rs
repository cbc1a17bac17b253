//! Version history for a single tracked manifest, backed by git or by nothing.

use crate::error::KeeperError;
use crate::keeper::util::run_command_with_optional_timeout;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revision {
    pub id: String,
    pub summary: String,
}

impl Revision {
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStatus {
    pub modified: Vec<String>,
    pub staged: Vec<String>,
    pub untracked: Vec<String>,
}

impl HistoryStatus {
    pub fn is_clean(&self) -> bool {
        self.modified.is_empty() && self.staged.is_empty() && self.untracked.is_empty()
    }
}

pub trait HistoryClient {
    fn is_available(&self) -> bool;

    /// Record the tracked file. `Ok(false)` means there was nothing to commit.
    fn commit(&self, message: &str) -> Result<bool, KeeperError>;

    /// Most recent first, restricted to the tracked file.
    fn log(&self, limit: usize) -> Result<Vec<Revision>, KeeperError>;

    fn show_at_revision(&self, id: &str, file: &str) -> Result<Vec<u8>, KeeperError>;

    /// Uncommitted changes when `revision` is `None`, else the change that
    /// revision introduced.
    fn diff(&self, revision: Option<&str>, color: bool) -> Result<String, KeeperError>;

    fn status(&self) -> Result<HistoryStatus, KeeperError>;
}

pub struct NoHistory;

const DISABLED: &str = "version history is disabled";

impl HistoryClient for NoHistory {
    fn is_available(&self) -> bool {
        false
    }

    fn commit(&self, _message: &str) -> Result<bool, KeeperError> {
        Err(KeeperError::HistoryUnavailable(DISABLED.to_string()))
    }

    fn log(&self, _limit: usize) -> Result<Vec<Revision>, KeeperError> {
        Err(KeeperError::HistoryUnavailable(DISABLED.to_string()))
    }

    fn show_at_revision(&self, _id: &str, _file: &str) -> Result<Vec<u8>, KeeperError> {
        Err(KeeperError::HistoryUnavailable(DISABLED.to_string()))
    }

    fn diff(&self, _revision: Option<&str>, _color: bool) -> Result<String, KeeperError> {
        Err(KeeperError::HistoryUnavailable(DISABLED.to_string()))
    }

    fn status(&self) -> Result<HistoryStatus, KeeperError> {
        Err(KeeperError::HistoryUnavailable(DISABLED.to_string()))
    }
}

pub struct GitHistory {
    git: Option<PathBuf>,
    dir: PathBuf,
    tracked: String,
    timeout_secs: u64,
    ignored: Vec<String>,
}

const BASE_IGNORES: &[&str] = &["*.sqlite3*", "*.shm", "*.wal", "*.backup_*"];

impl GitHistory {
    pub fn new(dir: impl Into<PathBuf>, tracked: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            git: which::which("git").ok(),
            dir: dir.into(),
            tracked: tracked.into(),
            timeout_secs,
            ignored: BASE_IGNORES.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Extra pattern written to `.gitignore` when the repository is created.
    pub fn ignoring(mut self, pattern: impl Into<String>) -> Self {
        self.ignored.push(pattern.into());
        self
    }

    fn has_repo(&self) -> bool {
        self.dir.join(".git").exists()
    }

    fn run(&self, args: &[&str]) -> Result<Output, KeeperError> {
        let Some(git) = &self.git else {
            return Err(KeeperError::HistoryUnavailable(
                "git binary not found on PATH".to_string(),
            ));
        };
        let mut cmd = Command::new(git);
        cmd.arg("-C").arg(&self.dir).args(args);
        tracing::debug!(
            operation = args.first().copied().unwrap_or(""),
            dir = %self.dir.display(),
            "running git"
        );
        run_command_with_optional_timeout(&mut cmd, Some(self.timeout_secs)).map_err(|err| {
            KeeperError::HistoryUnavailable(format!("git {}: {err:#}", args.join(" ")))
        })
    }

    fn run_ok(&self, args: &[&str]) -> Result<Output, KeeperError> {
        let output = self.run(args)?;
        if output.status.success() {
            return Ok(output);
        }
        Err(KeeperError::HistoryUnavailable(format!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }

    fn require_repo(&self) -> Result<(), KeeperError> {
        if self.git.is_none() {
            return Err(KeeperError::HistoryUnavailable(
                "git binary not found on PATH".to_string(),
            ));
        }
        if !self.has_repo() {
            return Err(KeeperError::HistoryUnavailable(format!(
                "{} is not a git repository yet",
                self.dir.display()
            )));
        }
        Ok(())
    }

    fn ensure_repo(&self) -> Result<(), KeeperError> {
        if self.has_repo() {
            return Ok(());
        }
        self.run_ok(&["init"])?;
        let gitignore = self.dir.join(".gitignore");
        if !gitignore.exists() {
            let mut body = String::from("# Generated by dt-keeper\n");
            for pattern in &self.ignored {
                body.push_str(pattern);
                body.push('\n');
            }
            fs::write(&gitignore, body).map_err(|err| {
                KeeperError::HistoryUnavailable(format!(
                    "failed to write {}: {err}",
                    gitignore.display()
                ))
            })?;
        }
        self.run(&["add", "--", ".gitignore"])?;
        self.run(&["commit", "-m", "Initial commit: add .gitignore", "--", ".gitignore"])?;
        tracing::info!(dir = %self.dir.display(), "initialized git repository");
        Ok(())
    }
}

impl HistoryClient for GitHistory {
    fn is_available(&self) -> bool {
        self.git.is_some()
    }

    fn commit(&self, message: &str) -> Result<bool, KeeperError> {
        self.ensure_repo()?;
        self.run_ok(&["add", "--", &self.tracked])?;
        // Exit 0: the index matches HEAD for the tracked file.
        let staged = self.run(&["diff", "--cached", "--quiet", "--", &self.tracked])?;
        match staged.status.code() {
            Some(0) => {
                tracing::debug!(file = %self.tracked, "nothing to commit");
                return Ok(false);
            }
            Some(1) => {}
            _ => {
                return Err(KeeperError::HistoryUnavailable(format!(
                    "git diff --cached failed: {}",
                    String::from_utf8_lossy(&staged.stderr).trim()
                )));
            }
        }
        self.run_ok(&["commit", "-m", message, "--", &self.tracked])?;
        Ok(true)
    }

    fn log(&self, limit: usize) -> Result<Vec<Revision>, KeeperError> {
        self.require_repo()?;
        let count = limit.to_string();
        let output = self.run(&["log", "-n", &count, "--format=%H%x09%s", "--", &self.tracked])?;
        if !output.status.success() {
            // A repository without commits has no log.
            return Ok(Vec::new());
        }
        Ok(parse_log(&String::from_utf8_lossy(&output.stdout)))
    }

    fn show_at_revision(&self, id: &str, file: &str) -> Result<Vec<u8>, KeeperError> {
        self.require_repo()?;
        let object = format!("{id}:{file}");
        let output = self.run(&["show", &object])?;
        if !output.status.success() {
            return Err(KeeperError::RevisionNotFound(object));
        }
        Ok(output.stdout)
    }

    fn diff(&self, revision: Option<&str>, color: bool) -> Result<String, KeeperError> {
        self.require_repo()?;
        let color = if color { "--color=always" } else { "--color=never" };
        let output = match revision {
            None => self.run_ok(&["diff", color, "--", &self.tracked])?,
            Some(id) => self.run_ok(&["show", "--format=", color, id, "--", &self.tracked])?,
        };
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn status(&self) -> Result<HistoryStatus, KeeperError> {
        self.require_repo()?;
        let output = self.run_ok(&["status", "--porcelain"])?;
        Ok(parse_porcelain(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse `git log --format=%H%x09%s` output.
pub fn parse_log(raw: &str) -> Vec<Revision> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| match line.split_once('\t') {
            Some((id, summary)) => Revision {
                id: id.trim().to_string(),
                summary: summary.to_string(),
            },
            None => Revision {
                id: line.trim().to_string(),
                summary: String::new(),
            },
        })
        .collect()
}

pub fn parse_porcelain(raw: &str) -> HistoryStatus {
    let mut status = HistoryStatus::default();
    for line in raw.lines() {
        if line.len() < 4 {
            continue;
        }
        let (code, path) = line.split_at(3);
        let path = path.to_string();
        let mut flags = code.chars();
        let index = flags.next().unwrap_or(' ');
        let worktree = flags.next().unwrap_or(' ');
        if index == '?' {
            status.untracked.push(path);
            continue;
        }
        if index != ' ' {
            status.staged.push(path.clone());
        }
        if worktree != ' ' {
            status.modified.push(path);
        }
    }
    status
}

/// Pick a revision from `log` (most recent first). Without a target, the
/// previous version is chosen. Prefixes must match exactly one revision.
pub fn resolve_revision<'a>(
    log: &'a [Revision],
    target: Option<&str>,
) -> Result<&'a Revision, KeeperError> {
    let Some(target) = target else {
        return log.get(1).ok_or(KeeperError::NoPreviousRevision);
    };
    let prefix = target.trim().to_lowercase();
    if prefix.is_empty() {
        return Err(KeeperError::RevisionNotFound(target.to_string()));
    }
    let matches = log
        .iter()
        .filter(|rev| rev.id.to_lowercase().starts_with(&prefix))
        .collect::<Vec<_>>();
    match matches.as_slice() {
        [] => Err(KeeperError::RevisionNotFound(target.to_string())),
        [only] => Ok(*only),
        many => Err(KeeperError::AmbiguousRevision {
            prefix: target.to_string(),
            candidates: many.iter().map(|rev| rev.short_id().to_string()).collect(),
        }),
    }
}
