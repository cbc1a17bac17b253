use anyhow::Result;

use crate::commands::{CommandReport, KeeperContext};
use crate::keeper::models::ModelLibrary;
use crate::keeper::util::format_size;

pub fn append_usage(library: &ModelLibrary, report: &mut CommandReport) {
    let usage = library.usage();
    report.detail(format!("disk usage models={}", format_size(usage.models)));
    report.detail(format!("disk usage loras={}", format_size(usage.loras)));
    report.detail(format!("disk usage total={}", format_size(usage.total)));
}

pub fn run(ctx: &KeeperContext) -> Result<CommandReport> {
    let mut report = CommandReport::new("models-usage");
    let library = ModelLibrary::from_config(&ctx.config, &ctx.paths);
    report.detail(format!("models_dir={}", library.dir().display()));
    if let Err(err) = library.ensure_dir() {
        report.issue(err.to_string());
        return Ok(report);
    }
    append_usage(&library, &mut report);
    Ok(report)
}
