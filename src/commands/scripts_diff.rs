use anyhow::Result;

use crate::commands::{CommandReport, KeeperContext, open_scripts};
use crate::keeper::history::resolve_revision;

#[derive(Debug, Clone, Default)]
pub struct ScriptsDiffOptions {
    pub commit: Option<String>,
    pub no_color: bool,
}

pub fn run(ctx: &KeeperContext, opts: &ScriptsDiffOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("scripts-diff");
    let Some(workspace) = open_scripts(ctx, &mut report) else {
        return Ok(report);
    };
    let history = workspace.history();
    let color = !opts.no_color;

    let diff = match &opts.commit {
        None => {
            report.detail("diff of uncommitted changes");
            history.diff(None, color)
        }
        Some(target) => {
            let resolved = history
                .log(workspace.log_limit())
                .and_then(|log| resolve_revision(&log, Some(target.as_str())).cloned());
            match resolved {
                Ok(revision) => {
                    report.detail(format!(
                        "diff for revision {} - {}",
                        revision.short_id(),
                        revision.summary
                    ));
                    history.diff(Some(&revision.id), color)
                }
                Err(err) => Err(err),
            }
        }
    };

    match diff {
        Ok(text) if text.trim().is_empty() => report.detail("no changes to show"),
        Ok(text) => report.detail(text.trim_end().to_string()),
        Err(err) => report.issue(format!("could not retrieve diff: {err}")),
    }
    Ok(report)
}
