use anyhow::Result;

use crate::commands::models_orphans::{PREVIEW_LIMIT, append_orphans};
use crate::commands::models_usage::append_usage;
use crate::commands::{CommandReport, KeeperContext};
use crate::keeper::audit;
use crate::keeper::entry::DeclaredEntry;
use crate::keeper::manifest::LoadStatus;
use crate::keeper::models::ModelLibrary;

#[derive(Debug, Clone, Default)]
pub struct ModelsCheckOptions {
    pub fix: bool,
}

pub fn run(ctx: &KeeperContext, opts: &ModelsCheckOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("models-check");
    let library = ModelLibrary::from_config(&ctx.config, &ctx.paths);
    report.detail(format!("models_dir={}", library.dir().display()));
    if let Err(err) = library.ensure_dir() {
        report.issue(err.to_string());
        return Ok(report);
    }

    let mut dirty = Vec::new();
    for check in library.check() {
        report.detail(format!("{}: {}", check.file, check.summary()));
        if let LoadStatus::Malformed(reason) = &check.loaded.status {
            report.issue(format!("{}: unreadable, left untouched ({reason})", check.file));
        }
        for rejected in &check.loaded.rejected {
            report.issue(format!("{}: {rejected}", check.file));
        }
        for missing in &check.result.missing {
            for unresolved in &missing.unresolved {
                report.detail(format!(
                    "  missing: {} ({}) referenced by '{}'",
                    unresolved.value, unresolved.field, missing.name
                ));
            }
        }
        for mismatch in &check.result.case_mismatches {
            let entry = &check.loaded.entries[mismatch.index];
            report.detail(format!(
                "  case mismatch: {} -> {} in '{}'",
                mismatch.declared,
                mismatch.actual,
                entry.display_name()
            ));
        }
        for key in &check.result.duplicates {
            report.detail(format!("  duplicate entries for {key}"));
        }
        if !check.is_clean() {
            dirty.push(check.file.clone());
        }
    }

    if opts.fix {
        for (file, outcome) in library.prune_all() {
            match outcome {
                Ok(pruned) => {
                    report.detail(format!(
                        "{file}: removed {} invalid entries",
                        pruned.removed.len()
                    ));
                    audit::record(
                        &ctx.paths,
                        "models-check",
                        "ok",
                        &format!("{file}: removed {}", pruned.removed.join(", ")),
                    );
                }
                Err(err) => {
                    report.issue(format!("{file}: fix failed: {err}"));
                    audit::record(&ctx.paths, "models-check", "failed", &err.to_string());
                }
            }
        }
    } else {
        for file in &dirty {
            report.issue(format!(
                "{file} references missing files; run with --fix to remove those entries"
            ));
        }
    }

    append_orphans(&library, &mut report, Some(PREVIEW_LIMIT));
    append_usage(&library, &mut report);
    Ok(report)
}
