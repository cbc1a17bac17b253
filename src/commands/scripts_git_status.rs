use anyhow::Result;

use crate::commands::{CommandReport, KeeperContext, open_scripts};

fn list(report: &mut CommandReport, label: &str, paths: &[String]) {
    if paths.is_empty() {
        return;
    }
    report.detail(format!("{label} ({}):", paths.len()));
    for path in paths {
        report.detail(format!("  - {path}"));
    }
}

pub fn run(ctx: &KeeperContext) -> Result<CommandReport> {
    let mut report = CommandReport::new("scripts-git-status");
    let Some(workspace) = open_scripts(ctx, &mut report) else {
        return Ok(report);
    };
    match workspace.history().status() {
        Ok(status) if status.is_clean() => report.detail("working tree clean"),
        Ok(status) => {
            list(&mut report, "modified", &status.modified);
            list(&mut report, "staged", &status.staged);
            list(&mut report, "untracked", &status.untracked);
        }
        Err(err) => report.issue(err.to_string()),
    }
    Ok(report)
}
