use anyhow::Result;
use std::env;

use crate::commands::{CommandReport, KeeperContext};
use crate::keeper::scripts::ScriptWorkspace;

mod generated {
    include!(concat!(env!("OUT_DIR"), "/keeper_env_allowlist.rs"));
}

pub use generated::GENERATED_KEEPER_ENV_ALLOWLIST;

/// `DT_KEEPER_*` variables currently set, in allowlist order.
pub fn active_env_overrides() -> Vec<(&'static str, String)> {
    GENERATED_KEEPER_ENV_ALLOWLIST
        .iter()
        .filter_map(|key| env::var(key).ok().map(|v| (*key, v)))
        .collect()
}

pub fn run(ctx: &KeeperContext) -> Result<CommandReport> {
    let mut report = CommandReport::new("status");
    let paths = &ctx.paths;
    let cfg = &ctx.config;

    report.detail(format!("version={}", env!("CARGO_PKG_VERSION")));
    report.detail(format!("keeper_home={}", paths.keeper_home.display()));
    report.detail(format!("container_dir={}", paths.container_dir.display()));
    report.detail(format!("models_dir={}", paths.models_dir.display()));
    report.detail(format!("scripts_dir={}", paths.scripts_dir.display()));
    report.detail(format!("caches_dir={}", paths.caches_dir.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));
    report.detail(format!("scripts_manifest={}", cfg.scripts.manifest));
    report.detail(format!(
        "model_manifests={}",
        cfg.models
            .manifests
            .iter()
            .map(|m| m.file.as_str())
            .collect::<Vec<_>>()
            .join(",")
    ));

    let workspace = ScriptWorkspace::from_config(cfg, paths);
    let history = workspace.history();
    report.detail(format!(
        "history={}",
        match (cfg.scripts.use_history, history.is_available()) {
            (false, _) => "disabled",
            (true, true) => "git",
            (true, false) => "unavailable (git not found)",
        }
    ));
    report.detail(format!("history_timeout_secs={}", cfg.history.timeout_secs));

    for (key, value) in active_env_overrides() {
        report.detail(format!("env {key}={value}"));
    }

    if !paths.models_dir.is_dir() {
        report.issue(format!("missing models dir ({})", paths.models_dir.display()));
    }
    if !paths.scripts_dir.is_dir() {
        report.issue(format!("missing scripts dir ({})", paths.scripts_dir.display()));
    }
    Ok(report)
}
