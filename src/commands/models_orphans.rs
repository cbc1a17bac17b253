use anyhow::Result;

use crate::commands::{CommandReport, KeeperContext};
use crate::keeper::models::ModelLibrary;

/// Names listed by `models-check` before the rest are summarized.
pub const PREVIEW_LIMIT: usize = 10;

/// Orphan section shared with `models-check`; `limit` caps the names listed.
pub fn append_orphans(library: &ModelLibrary, report: &mut CommandReport, limit: Option<usize>) {
    let orphaned = library.orphans();
    if orphaned.is_empty() {
        report.detail("orphaned models: none");
        return;
    }
    report.detail(format!("orphaned models: {}", orphaned.len()));
    let shown = limit.unwrap_or(orphaned.len()).min(orphaned.len());
    for name in &orphaned[..shown] {
        report.detail(format!("  - {name}"));
    }
    if orphaned.len() > shown {
        report.detail(format!("  ... and {} more", orphaned.len() - shown));
    }
}

pub fn run(ctx: &KeeperContext) -> Result<CommandReport> {
    let mut report = CommandReport::new("models-orphans");
    let library = ModelLibrary::from_config(&ctx.config, &ctx.paths);
    report.detail(format!("models_dir={}", library.dir().display()));
    if let Err(err) = library.ensure_dir() {
        report.issue(err.to_string());
        return Ok(report);
    }
    append_orphans(&library, &mut report, None);
    Ok(report)
}
