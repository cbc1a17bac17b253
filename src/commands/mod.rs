pub mod cache_clear;
pub mod models_check;
pub mod models_orphans;
pub mod models_usage;
pub mod scripts_diff;
pub mod scripts_export;
pub mod scripts_git_status;
pub mod scripts_history;
pub mod scripts_list;
pub mod scripts_manage;
pub mod scripts_normalize;
pub mod scripts_rollback;
pub mod scripts_sync;
pub mod scripts_validate;
pub mod status;

use anyhow::Result;
use serde::Serialize;

use crate::keeper::config::{KeeperConfig, load_config};
use crate::keeper::entry::ScriptEntry;
use crate::keeper::guard::SaveOutcome;
use crate::keeper::manifest::{LoadStatus, Loaded};
use crate::keeper::paths::{KeeperPaths, PathOverrides, resolve_paths};
use crate::keeper::scripts::ScriptWorkspace;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    pub fn merge(&mut self, mut other: CommandReport) {
        self.ok &= other.ok;
        self.details.append(&mut other.details);
        self.issues.append(&mut other.issues);
    }

    pub fn render_text(&self) -> String {
        let mut out = format!(
            "{} {}\n",
            self.command,
            if self.ok { "ok" } else { "found issues" }
        );
        for line in &self.details {
            out.push_str(line);
            out.push('\n');
        }
        if !self.issues.is_empty() {
            out.push_str("issues:\n");
            for issue in &self.issues {
                out.push_str("  - ");
                out.push_str(issue);
                out.push('\n');
            }
        }
        out
    }
}

/// Resolved configuration and paths shared by every command.
#[derive(Debug, Clone)]
pub struct KeeperContext {
    pub config: KeeperConfig,
    pub paths: KeeperPaths,
}

impl KeeperContext {
    pub fn load(overrides: &PathOverrides) -> Result<Self> {
        Ok(Self {
            config: load_config()?,
            paths: resolve_paths(overrides)?,
        })
    }
}

/// The scripts workspace, or `None` (with an issue recorded) when its
/// directory is missing.
pub fn open_scripts(ctx: &KeeperContext, report: &mut CommandReport) -> Option<ScriptWorkspace> {
    let workspace = ScriptWorkspace::from_config(&ctx.config, &ctx.paths);
    report.detail(format!("scripts_dir={}", workspace.dir().display()));
    if let Err(err) = workspace.ensure_dir() {
        report.issue(err.to_string());
        return None;
    }
    Some(workspace)
}

/// Record unreadable manifest content as issues. Returns false when the
/// manifest must not be rewritten.
pub fn check_manifest_health(
    loaded: &Loaded<ScriptEntry>,
    manifest: &str,
    report: &mut CommandReport,
) -> bool {
    match &loaded.status {
        LoadStatus::Absent => report.detail(format!("{manifest} not found; treating as empty")),
        LoadStatus::Parsed => report.detail(format!("{manifest} is valid JSON")),
        LoadStatus::Malformed(reason) => {
            report.issue(format!("invalid JSON in {manifest}: {reason}"));
        }
    }
    for rejected in &loaded.rejected {
        report.issue(format!("{manifest}: {rejected}"));
    }
    !matches!(loaded.status, LoadStatus::Malformed(_)) && loaded.rejected.is_empty()
}

pub fn dry_run_hint(report: &mut CommandReport) {
    report.detail("dry run; nothing written (pass --apply to write changes)");
}

pub fn record_save(report: &mut CommandReport, outcome: &SaveOutcome) {
    report.detail(format!(
        "saved {}{}",
        outcome.path.display(),
        if outcome.created { " (created)" } else { "" }
    ));
    if outcome.committed {
        report.detail("committed to version history");
    } else if let Some(note) = &outcome.commit_note {
        report.detail(format!("not committed: {note}"));
    }
}
