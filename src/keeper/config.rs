use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelManifestKind {
    pub file: String,
    pub refs: Vec<String>,
}

impl ModelManifestKind {
    fn new(file: &str, refs: &[&str]) -> Self {
        Self {
            file: file.to_string(),
            refs: refs.iter().map(|r| (*r).to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub extension: String,
    pub manifests: Vec<ModelManifestKind>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            extension: "ckpt".to_string(),
            manifests: vec![
                ModelManifestKind::new(
                    "custom.json",
                    &["file", "autoencoder", "text_encoder", "clip_encoder"],
                ),
                ModelManifestKind::new("custom_lora.json", &["file"]),
                ModelManifestKind::new("custom_controlnet.json", &["file"]),
                ModelManifestKind::new("custom_textual_inversions.json", &["file"]),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    pub manifest: String,
    pub extension: String,
    #[serde(default = "default_use_history")]
    pub use_history: bool,
    #[serde(default = "default_summary_file")]
    pub summary_file: String,
}

fn default_use_history() -> bool {
    true
}

fn default_summary_file() -> String {
    "script_summary.txt".to_string()
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            manifest: "custom_scripts.json".to_string(),
            extension: "js".to_string(),
            use_history: true,
            summary_file: default_summary_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    pub timeout_secs: u64,
    pub log_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            log_limit: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheTarget {
    pub dir: String,
    pub description: String,
    /// Part of the selective (network-only) clear.
    #[serde(default)]
    pub selective: bool,
}

impl CacheTarget {
    fn new(dir: &str, description: &str, selective: bool) -> Self {
        Self {
            dir: dir.to_string(),
            description: description.to_string(),
            selective,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub targets: Vec<CacheTarget>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            targets: vec![
                CacheTarget::new("net", "Network cache (model catalogs)", true),
                CacheTarget::new("qwen_image", "Qwen model cache", false),
                CacheTarget::new("com.liuliu.draw-things", "App cache database", false),
                CacheTarget::new("mfa_v2", "MFA cache", false),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KeeperConfig {
    pub models: ModelsConfig,
    pub scripts: ScriptsConfig,
    pub history: HistoryConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialKeeperConfig {
    models: Option<ModelsConfig>,
    scripts: Option<ScriptsConfig>,
    history: Option<HistoryConfig>,
    cache: Option<CacheConfig>,
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_usize(var: &str, fallback: usize) -> usize {
    match env::var(var) {
        Ok(v) => v.trim().parse::<usize>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => {
            let trimmed = v.trim();
            match trimmed {
                "1" | "true" | "TRUE" | "yes" | "on" => true,
                "0" | "false" | "FALSE" | "no" | "off" => false,
                _ => fallback,
            }
        }
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn validate(cfg: &KeeperConfig) -> Result<()> {
    if cfg.models.extension.trim().is_empty() {
        return Err(anyhow!("invalid models extension: cannot be empty"));
    }
    if cfg.models.manifests.is_empty() {
        return Err(anyhow!("invalid models config: at least one manifest is required"));
    }
    for kind in &cfg.models.manifests {
        if kind.file.trim().is_empty() {
            return Err(anyhow!("invalid models manifest: file name cannot be empty"));
        }
        if kind.refs.is_empty() {
            return Err(anyhow!(
                "invalid models manifest {}: at least one reference key is required",
                kind.file
            ));
        }
    }
    if cfg.scripts.manifest.trim().is_empty() {
        return Err(anyhow!("invalid scripts manifest: cannot be empty"));
    }
    if cfg.scripts.extension.trim().is_empty() {
        return Err(anyhow!("invalid scripts extension: cannot be empty"));
    }
    if cfg.history.timeout_secs == 0 {
        return Err(anyhow!("invalid history timeout: must be >= 1 second"));
    }
    if cfg.history.log_limit < 2 {
        return Err(anyhow!("invalid history log limit: must be >= 2"));
    }
    if cfg.cache.targets.iter().any(|t| t.dir.trim().is_empty()) {
        return Err(anyhow!("invalid cache target: dir cannot be empty"));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("DT_KEEPER_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".dt-keeper").join("config.toml"))
}

fn merge_toml(base: &mut KeeperConfig, raw: &str) -> Result<()> {
    let parsed: PartialKeeperConfig = toml::from_str(raw)?;
    if let Some(models) = parsed.models {
        base.models = models;
    }
    if let Some(scripts) = parsed.scripts {
        base.scripts = scripts;
    }
    if let Some(history) = parsed.history {
        base.history = history;
    }
    if let Some(cache) = parsed.cache {
        base.cache = cache;
    }
    Ok(())
}

fn merge_file_config(base: &mut KeeperConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    merge_toml(base, &raw)
        .map_err(|err| anyhow!("failed to parse keeper config {}: {err}", path.display()))
}

pub fn load_config() -> Result<KeeperConfig> {
    let mut cfg = KeeperConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.models.extension = env_or_string("DT_KEEPER_MODEL_EXTENSION", &cfg.models.extension);
    cfg.scripts.manifest = env_or_string("DT_KEEPER_SCRIPTS_MANIFEST", &cfg.scripts.manifest);
    cfg.scripts.extension = env_or_string("DT_KEEPER_SCRIPT_EXTENSION", &cfg.scripts.extension);
    cfg.scripts.use_history = env_or_bool("DT_KEEPER_HISTORY", cfg.scripts.use_history);
    cfg.history.timeout_secs =
        env_or_u64("DT_KEEPER_HISTORY_TIMEOUT_SECS", cfg.history.timeout_secs);
    cfg.history.log_limit = env_or_usize("DT_KEEPER_HISTORY_LOG_LIMIT", cfg.history.log_limit);

    validate(&cfg)?;
    Ok(cfg)
}
