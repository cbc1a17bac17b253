use anyhow::Result;

use crate::commands::{CommandReport, KeeperContext, check_manifest_health, open_scripts};
use crate::keeper::extract::read_header_metadata;
use crate::keeper::reconcile::observed_index;
use crate::keeper::scripts::Snapshot;
use crate::keeper::util::truncate_with_ellipsis;

const DESCRIPTION_PREVIEW: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct ScriptsListOptions {
    pub details: bool,
}

fn entry_status(snapshot: &Snapshot, file: &str) -> String {
    if let Some(found) = snapshot.observed.iter().find(|f| f.name == file) {
        return format!("exists ({} bytes)", found.size);
    }
    let index = observed_index(&snapshot.observed);
    match index.get(&file.to_lowercase()) {
        Some(actual) => {
            let size = snapshot
                .observed
                .iter()
                .find(|f| f.name == *actual)
                .map(|f| f.size)
                .unwrap_or_default();
            format!("case mismatch (manifest: {file}, file: {actual}) ({size} bytes)")
        }
        None => "missing".to_string(),
    }
}

/// Listing lines for every entry and every untracked file.
pub fn append_listing(
    report: &mut CommandReport,
    snapshot: &Snapshot,
    details: bool,
    dir: &std::path::Path,
) {
    let entries = &snapshot.loaded.entries;
    report.detail(format!("script files: {}", snapshot.observed.len()));
    report.detail(format!("scripts with metadata: {}", entries.len()));

    let mut sorted = entries.iter().collect::<Vec<_>>();
    sorted.sort_by_cached_key(|e| e.name.to_lowercase());
    for entry in sorted {
        report.detail(format!("script: {}", entry.name));
        report.detail(format!("  file: {}", entry.file));
        if let Some(author) = entry.author.as_deref().filter(|a| !a.is_empty()) {
            report.detail(format!("  author: {author}"));
        }
        if let Some(description) = entry.description.as_deref().filter(|d| !d.is_empty()) {
            report.detail(format!(
                "  description: {}",
                truncate_with_ellipsis(description, DESCRIPTION_PREVIEW)
            ));
        }
        if let Some(tags) = entry.tags.as_ref().filter(|t| !t.is_empty()) {
            report.detail(format!("  tags: {}", tags.join(", ")));
        }
        report.detail(format!("  status: {}", entry_status(snapshot, &entry.file)));
        if details {
            if let Some(images) = entry.images.as_ref().filter(|i| !i.is_empty()) {
                report.detail(format!("  images: {}", images.len()));
            }
            if let Some(color) = &entry.base_color {
                report.detail(format!("  base color: {color}"));
            }
        }
    }

    let mut orphaned = snapshot
        .observed
        .iter()
        .filter(|f| snapshot.result.orphaned.contains(&f.name))
        .collect::<Vec<_>>();
    orphaned.sort_by_cached_key(|f| f.name.to_lowercase());
    if !orphaned.is_empty() {
        report.detail(format!("untracked files: {}", orphaned.len()));
    }
    for file in orphaned {
        report.detail(format!("  - {} ({} bytes)", file.name, file.size));
        if details {
            let header = read_header_metadata(&dir.join(&file.name));
            if !header.is_empty() {
                let pairs = header
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                report.detail(format!("    header: {pairs}"));
            }
        }
    }
}

pub fn run(ctx: &KeeperContext, opts: &ScriptsListOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("scripts-list");
    let Some(workspace) = open_scripts(ctx, &mut report) else {
        return Ok(report);
    };
    let snapshot = workspace.snapshot();
    check_manifest_health(&snapshot.loaded, workspace.manifest_name(), &mut report);
    append_listing(&mut report, &snapshot, opts.details, workspace.dir());
    Ok(report)
}
