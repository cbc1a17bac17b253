use anyhow::Result;

use crate::commands::{CommandReport, KeeperContext, dry_run_hint};
use crate::keeper::audit;
use crate::keeper::cache::{ClearMode, cache_status, clear_caches};
use crate::keeper::util::format_size;

#[derive(Debug, Clone, Default)]
pub struct CacheClearOptions {
    pub all: bool,
    pub apply: bool,
}

pub fn run(ctx: &KeeperContext, opts: &CacheClearOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("cache-clear");
    let caches_dir = &ctx.paths.caches_dir;
    let targets = &ctx.config.cache.targets;
    report.detail(format!("container_dir={}", ctx.paths.container_dir.display()));
    report.detail(format!("caches_dir={}", caches_dir.display()));

    if !caches_dir.is_dir() {
        report.detail("no cache directory; nothing to clear");
        return Ok(report);
    }

    let status = cache_status(caches_dir, targets);
    for dir in &status.dirs {
        report.detail(format!(
            "cache {}: {} ({} files)",
            dir.dir,
            format_size(dir.usage.size),
            dir.usage.files
        ));
    }
    report.detail(format!(
        "cache total: {} ({} files)",
        format_size(status.total.size),
        status.total.files
    ));
    if status.total.files == 0 {
        report.detail("cache is already empty");
        return Ok(report);
    }

    let mode = if opts.all {
        ClearMode::All
    } else {
        ClearMode::Selective
    };
    let dry_run = !opts.apply;
    let result = match clear_caches(caches_dir, targets, mode, dry_run) {
        Ok(result) => result,
        Err(err) => {
            report.issue(format!("cache clear failed: {err:#}"));
            audit::record(&ctx.paths, "cache-clear", "failed", &format!("{err:#}"));
            return Ok(report);
        }
    };

    if result.cleared.is_empty() {
        report.detail("nothing to clear");
        return Ok(report);
    }
    let verb = if dry_run { "would clear" } else { "cleared" };
    for dir in &result.cleared {
        report.detail(format!(
            "{verb}: {} at {} ({}, {} files)",
            dir.description,
            dir.path.display(),
            format_size(dir.usage.size),
            dir.usage.files
        ));
    }

    if dry_run {
        report.detail(format!("would free {}", format_size(result.total.size)));
        dry_run_hint(&mut report);
        if mode == ClearMode::Selective {
            report.detail("pass --all to include model caches");
        }
    } else {
        report.detail(format!("freed {}", format_size(result.total.size)));
        let names = result
            .cleared
            .iter()
            .map(|d| d.dir.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        audit::record(&ctx.paths, "cache-clear", "ok", &format!("cleared {names}"));
    }
    Ok(report)
}
