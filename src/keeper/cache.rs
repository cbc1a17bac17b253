//! Application cache directories under `<container>/Library/Caches`.

use crate::keeper::config::CacheTarget;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DirUsage {
    pub size: u64,
    pub files: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheDirStatus {
    pub dir: String,
    pub description: String,
    pub path: PathBuf,
    pub usage: DirUsage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatus {
    pub dirs: Vec<CacheDirStatus>,
    pub total: DirUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearMode {
    /// Network cache only; safe to drop at any time.
    Selective,
    All,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClearResult {
    pub cleared: Vec<CacheDirStatus>,
    pub total: DirUsage,
    pub dry_run: bool,
}

/// Recursive size and regular-file count. Unreadable entries are skipped.
pub fn dir_usage(dir: &Path) -> DirUsage {
    let mut usage = DirUsage::default();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(meta) = entry.metadata() {
            usage.files += 1;
            usage.size += meta.len();
        }
    }
    usage
}

/// Targets that exist on disk, with their current usage.
pub fn cache_status(caches_dir: &Path, targets: &[CacheTarget]) -> CacheStatus {
    let mut status = CacheStatus::default();
    for target in targets {
        let path = caches_dir.join(&target.dir);
        if !path.is_dir() {
            continue;
        }
        let usage = dir_usage(&path);
        status.total.size += usage.size;
        status.total.files += usage.files;
        status.dirs.push(CacheDirStatus {
            dir: target.dir.clone(),
            description: target.description.clone(),
            path,
            usage,
        });
    }
    status
}

/// Empty the selected targets (delete, then recreate the directory). Targets
/// that are absent or hold no files are skipped.
pub fn clear_caches(
    caches_dir: &Path,
    targets: &[CacheTarget],
    mode: ClearMode,
    dry_run: bool,
) -> Result<ClearResult> {
    let selected = targets
        .iter()
        .filter(|t| mode == ClearMode::All || t.selective)
        .cloned()
        .collect::<Vec<_>>();
    let status = cache_status(caches_dir, &selected);

    let mut result = ClearResult {
        dry_run,
        ..ClearResult::default()
    };
    for dir in status.dirs {
        if dir.usage.files == 0 {
            continue;
        }
        if !dry_run {
            fs::remove_dir_all(&dir.path)
                .with_context(|| format!("failed to remove {}", dir.path.display()))?;
            fs::create_dir_all(&dir.path)
                .with_context(|| format!("failed to recreate {}", dir.path.display()))?;
            tracing::info!(dir = %dir.path.display(), bytes = dir.usage.size, "cleared cache");
        }
        result.total.size += dir.usage.size;
        result.total.files += dir.usage.files;
        result.cleared.push(dir);
    }
    Ok(result)
}
