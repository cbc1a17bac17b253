use anyhow::Result;

use crate::commands::{
    CommandReport, KeeperContext, check_manifest_health, dry_run_hint, open_scripts, record_save,
};
use crate::keeper::audit;
use crate::keeper::mutate::{SyncSkip, sync_add};

#[derive(Debug, Clone, Default)]
pub struct ScriptsSyncOptions {
    /// Only these files; every untracked file when empty.
    pub files: Vec<String>,
    pub apply: bool,
}

pub fn run(ctx: &KeeperContext, opts: &ScriptsSyncOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("scripts-sync");
    let Some(workspace) = open_scripts(ctx, &mut report) else {
        return Ok(report);
    };
    let snapshot = workspace.snapshot();
    if !check_manifest_health(&snapshot.loaded, workspace.manifest_name(), &mut report) {
        report.issue(format!(
            "{} left untouched until it can be read",
            workspace.manifest_name()
        ));
        return Ok(report);
    }
    if snapshot.result.orphaned.is_empty() && opts.files.is_empty() {
        report.detail("no untracked files to sync");
        return Ok(report);
    }

    let selection = (!opts.files.is_empty()).then_some(opts.files.as_slice());
    let before = snapshot.loaded.entries.len();
    let outcome = sync_add(snapshot.loaded.entries, &snapshot.observed, selection, |file| {
        workspace.build_entry(file)
    });

    for skip in &outcome.skipped {
        match skip {
            SyncSkip::AlreadyDeclared { file, declared_as } => {
                report.detail(format!("skipping {file} (already tracked as {declared_as})"));
            }
            SyncSkip::NotOrphaned { file } => {
                report.detail(format!("skipping {file} (not an untracked script file)"));
            }
        }
    }
    if outcome.added.is_empty() {
        report.detail("no files to add");
        return Ok(report);
    }

    let verb = if opts.apply { "adding" } else { "would add" };
    for entry in &outcome.entries[before..] {
        report.detail(format!("{verb}: {} ({})", entry.name, entry.file));
    }

    if !opts.apply {
        report.detail(format!("would add {} entries", outcome.added.len()));
        dry_run_hint(&mut report);
        return Ok(report);
    }

    let message = format!(
        "Add metadata for {} script(s): {}",
        outcome.added.len(),
        outcome.added.join(", ")
    );
    match workspace.save(&outcome.entries, &message) {
        Ok(saved) => {
            report.detail(format!("added {} entries", outcome.added.len()));
            record_save(&mut report, &saved);
            audit::record(&ctx.paths, "scripts-sync", "ok", &message);
        }
        Err(err) => {
            report.issue(format!("failed to save metadata: {err}"));
            audit::record(&ctx.paths, "scripts-sync", "failed", &err.to_string());
        }
    }
    Ok(report)
}
