use anyhow::Result;

use crate::commands::{CommandReport, KeeperContext, dry_run_hint, open_scripts, record_save};
use crate::keeper::audit;
use crate::keeper::guard::list_backups;
use crate::keeper::history::resolve_revision;
use crate::keeper::manifest::LoadStatus;
use crate::keeper::scripts::ScriptWorkspace;

const BACKUPS_SHOWN: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct ScriptsRollbackOptions {
    pub commit: Option<String>,
    pub apply: bool,
}

fn list_backup_alternatives(workspace: &ScriptWorkspace, report: &mut CommandReport) {
    let backups = list_backups(workspace.manifest_path());
    if backups.is_empty() {
        report.detail("no backup files found");
        return;
    }
    report.detail(format!(
        "found {} backup(s); restore one manually by copying it over {}",
        backups.len(),
        workspace.manifest_name()
    ));
    for backup in backups.iter().take(BACKUPS_SHOWN) {
        report.detail(format!("  backup: {}", backup.display()));
    }
}

pub fn run(ctx: &KeeperContext, opts: &ScriptsRollbackOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("scripts-rollback");
    let Some(workspace) = open_scripts(ctx, &mut report) else {
        return Ok(report);
    };
    let history = workspace.history();

    let log = match history.log(workspace.log_limit()) {
        Ok(log) => log,
        Err(err) => {
            report.issue(format!("cannot roll back: {err}"));
            list_backup_alternatives(&workspace, &mut report);
            return Ok(report);
        }
    };
    if log.is_empty() {
        report.issue(format!("no history found for {}", workspace.manifest_name()));
        list_backup_alternatives(&workspace, &mut report);
        return Ok(report);
    }

    report.detail(format!("recent revisions of {}:", workspace.manifest_name()));
    for revision in &log {
        report.detail(format!("  {} - {}", revision.short_id(), revision.summary));
    }

    let target = match resolve_revision(&log, opts.commit.as_deref()) {
        Ok(target) => target,
        Err(err) => {
            report.issue(err.to_string());
            return Ok(report);
        }
    };
    report.detail(format!(
        "target: {} - {}",
        target.short_id(),
        target.summary
    ));

    let bytes = match history.show_at_revision(&target.id, workspace.manifest_name()) {
        Ok(bytes) => bytes,
        Err(err) => {
            report.issue(format!("could not read revision {}: {err}", target.short_id()));
            return Ok(report);
        }
    };
    let restored = workspace.store().parse(&bytes);
    if let LoadStatus::Malformed(reason) = &restored.status {
        report.issue(format!(
            "revision {} does not hold a JSON array ({reason}); refusing to restore it",
            target.short_id()
        ));
        return Ok(report);
    }
    let current_size = std::fs::metadata(workspace.manifest_path())
        .map(|m| m.len())
        .unwrap_or(0);
    report.detail(format!("current file: {current_size} bytes"));
    report.detail(format!(
        "restored file: {} bytes, {} entries",
        bytes.len(),
        restored.entries.len() + restored.rejected.len()
    ));

    if !opts.apply {
        dry_run_hint(&mut report);
        return Ok(report);
    }

    let message = format!("Rollback to {}", target.short_id());
    match workspace.save_raw(&bytes, &message) {
        Ok(saved) => {
            report.detail(format!(
                "rolled back {} to {}",
                workspace.manifest_name(),
                target.short_id()
            ));
            record_save(&mut report, &saved);
            audit::record(&ctx.paths, "scripts-rollback", "ok", &message);
        }
        Err(err) => {
            report.issue(format!("rollback failed: {err}"));
            audit::record(&ctx.paths, "scripts-rollback", "failed", &err.to_string());
        }
    }
    Ok(report)
}
