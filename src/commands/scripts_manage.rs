use anyhow::Result;

use crate::commands::scripts_sync::{self, ScriptsSyncOptions};
use crate::commands::{CommandReport, KeeperContext, open_scripts};

#[derive(Debug, Clone, Default)]
pub struct ScriptsManageOptions {
    pub status: bool,
    pub auto_sync: bool,
}

pub fn run(ctx: &KeeperContext, opts: &ScriptsManageOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("scripts-manage");
    let Some(workspace) = open_scripts(ctx, &mut report) else {
        return Ok(report);
    };
    let snapshot = workspace.snapshot();
    let result = &snapshot.result;

    if opts.status {
        let mut tracked = snapshot.loaded.entries.iter().enumerate().collect::<Vec<_>>();
        tracked.sort_by_cached_key(|(_, e)| e.name.to_lowercase());
        report.detail(format!("tracked in metadata: {}", tracked.len()));
        for (i, entry) in tracked {
            if result.is_missing(i) {
                report.detail(format!("  - {} (file missing)", entry.file));
                continue;
            }
            let size = snapshot
                .observed
                .iter()
                .find(|f| f.key() == entry.file.to_lowercase())
                .map(|f| f.size)
                .unwrap_or_default();
            report.detail(format!("  - {} ({size} bytes) {}", entry.file, entry.name));
        }
        if result.orphaned.is_empty() {
            report.detail("all files are tracked");
        } else {
            report.detail(format!("not tracked: {}", result.orphaned.len()));
            for name in &result.orphaned {
                report.detail(format!("  - {name}"));
            }
        }
        for missing in &result.missing {
            report.issue(format!("tracked entry '{}' has no file", missing.name));
        }
    }

    if opts.auto_sync {
        if result.orphaned.is_empty() {
            report.detail("all files are already tracked in metadata");
        } else {
            report.detail(format!("auto-syncing {} file(s)", result.orphaned.len()));
            let synced = scripts_sync::run(
                ctx,
                &ScriptsSyncOptions {
                    files: result.orphaned.clone(),
                    apply: true,
                },
            )?;
            report.merge(synced);
        }
    } else if !result.orphaned.is_empty() {
        report.detail(format!(
            "found {} file(s) not in metadata: {}",
            result.orphaned.len(),
            result.orphaned.join(", ")
        ));
        report.detail("run with --auto-sync to add them");
    }
    Ok(report)
}
