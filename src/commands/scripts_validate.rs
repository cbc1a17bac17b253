use anyhow::Result;

use crate::commands::{CommandReport, KeeperContext, check_manifest_health, open_scripts};
use crate::keeper::scripts::Snapshot;

/// Validation section shared with `scripts-export`. Missing files and
/// duplicate entries are issues; untracked files and case differences are
/// informational.
pub fn append_validation(report: &mut CommandReport, snapshot: &Snapshot, manifest: &str) {
    check_manifest_health(&snapshot.loaded, manifest, report);
    let result = &snapshot.result;

    if result.missing.is_empty() {
        report.detail("all tracked files exist");
    }
    for missing in &result.missing {
        for unresolved in &missing.unresolved {
            report.issue(format!(
                "missing file: {} (entry '{}')",
                unresolved.value, missing.name
            ));
        }
    }

    if result.orphaned.is_empty() {
        report.detail("no untracked files");
    } else {
        report.detail(format!(
            "untracked files ({}): {}",
            result.orphaned.len(),
            result.orphaned.join(", ")
        ));
    }

    if result.duplicates.is_empty() {
        report.detail("no duplicate entries");
    }
    for key in &result.duplicates {
        report.issue(format!("duplicate entries for {key}"));
    }

    for mismatch in &result.case_mismatches {
        report.detail(format!(
            "case mismatch: manifest {} -> file {}",
            mismatch.declared, mismatch.actual
        ));
    }
}

pub fn run(ctx: &KeeperContext) -> Result<CommandReport> {
    let mut report = CommandReport::new("scripts-validate");
    let Some(workspace) = open_scripts(ctx, &mut report) else {
        return Ok(report);
    };
    let snapshot = workspace.snapshot();
    append_validation(&mut report, &snapshot, workspace.manifest_name());
    Ok(report)
}
