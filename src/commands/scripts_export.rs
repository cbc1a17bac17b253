use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;

use crate::commands::scripts_list::append_listing;
use crate::commands::scripts_validate::append_validation;
use crate::commands::{CommandReport, KeeperContext, open_scripts};
use crate::keeper::reconcile::Reconciliation;
use crate::keeper::util::now_rfc3339;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptsExportOptions {
    pub output: Option<PathBuf>,
    pub format: ExportFormat,
}

#[derive(Debug, Serialize)]
struct ScriptSummary<'a> {
    generated_at: String,
    scripts_dir: String,
    manifest: &'a str,
    entries: Vec<Map<String, Value>>,
    reconciliation: &'a Reconciliation,
    ok: bool,
    issues: Vec<String>,
}

pub fn run(ctx: &KeeperContext, opts: &ScriptsExportOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("scripts-export");
    let Some(workspace) = open_scripts(ctx, &mut report) else {
        return Ok(report);
    };
    let snapshot = workspace.snapshot();

    let mut summary = CommandReport::new("script summary");
    append_listing(&mut summary, &snapshot, true, workspace.dir());
    append_validation(&mut summary, &snapshot, workspace.manifest_name());

    let body = match opts.format {
        ExportFormat::Text => summary.render_text(),
        ExportFormat::Json => {
            let document = ScriptSummary {
                generated_at: now_rfc3339(),
                scripts_dir: workspace.dir().display().to_string(),
                manifest: workspace.manifest_name(),
                entries: snapshot
                    .loaded
                    .entries
                    .iter()
                    .map(|e| e.to_object())
                    .collect(),
                reconciliation: &snapshot.result,
                ok: summary.ok,
                issues: summary.issues.clone(),
            };
            let mut text = serde_json::to_string_pretty(&document)?;
            text.push('\n');
            text
        }
    };

    let output = opts
        .output
        .clone()
        .unwrap_or_else(|| workspace.summary_path());
    fs::write(&output, body).with_context(|| format!("failed to write {}", output.display()))?;
    report.detail(format!("summary exported to {}", output.display()));
    Ok(report)
}
