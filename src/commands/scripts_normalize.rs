use anyhow::Result;

use crate::commands::{
    CommandReport, KeeperContext, check_manifest_health, dry_run_hint, open_scripts, record_save,
};
use crate::keeper::audit;
use crate::keeper::mutate::{NormalizeOptions, normalize};

#[derive(Debug, Clone)]
pub struct ScriptsNormalizeOptions {
    pub fix_case: bool,
    pub sort: bool,
    pub apply: bool,
}

fn commit_message(changes: &[String]) -> String {
    let mut message = format!(
        "Normalize metadata: {}",
        changes.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
    );
    if changes.len() > 3 {
        message.push_str(&format!(" (+{} more)", changes.len() - 3));
    }
    message
}

pub fn run(ctx: &KeeperContext, opts: &ScriptsNormalizeOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("scripts-normalize");
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

    let outcome = normalize(
        snapshot.loaded.entries,
        &snapshot.observed,
        NormalizeOptions {
            fix_case: opts.fix_case,
            sort: opts.sort,
        },
    );
    if outcome.is_noop() {
        report.detail("no normalization needed");
        return Ok(report);
    }

    let changes = outcome
        .changes
        .iter()
        .map(|c| c.describe())
        .collect::<Vec<_>>();
    let verb = if opts.apply { "change" } else { "would change" };
    for change in &changes {
        report.detail(format!("{verb}: {change}"));
    }
    report.detail(format!("total: {} change(s)", changes.len()));

    if !opts.apply {
        dry_run_hint(&mut report);
        return Ok(report);
    }

    let message = commit_message(&changes);
    match workspace.save(&outcome.entries, &message) {
        Ok(saved) => {
            record_save(&mut report, &saved);
            audit::record(&ctx.paths, "scripts-normalize", "ok", &message);
        }
        Err(err) => {
            report.issue(format!("failed to normalize metadata: {err}"));
            audit::record(&ctx.paths, "scripts-normalize", "failed", &err.to_string());
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::commit_message;

    #[test]
    fn commit_message_lists_first_three_changes() {
        let changes = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|s| (*s).to_string())
            .collect::<Vec<_>>();
        assert_eq!(
            commit_message(&changes),
            "Normalize metadata: a, b, c (+2 more)"
        );
        assert_eq!(commit_message(&changes[..1]), "Normalize metadata: a");
    }
}
