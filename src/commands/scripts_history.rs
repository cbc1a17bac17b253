use anyhow::Result;

use crate::commands::{CommandReport, KeeperContext, open_scripts};

#[derive(Debug, Clone, Default)]
pub struct ScriptsHistoryOptions {
    pub limit: Option<usize>,
}

pub fn run(ctx: &KeeperContext, opts: &ScriptsHistoryOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("scripts-history");
    let Some(workspace) = open_scripts(ctx, &mut report) else {
        return Ok(report);
    };
    let limit = opts.limit.unwrap_or(workspace.log_limit());
    match workspace.history().log(limit) {
        Ok(log) if log.is_empty() => report.detail("no history recorded yet"),
        Ok(log) => {
            for revision in log {
                report.detail(format!("{} - {}", revision.short_id(), revision.summary));
            }
        }
        Err(err) => report.issue(err.to_string()),
    }
    Ok(report)
}
