use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};

const APP_CONTAINER: &str = "Library/Containers/com.liuliu.draw-things/Data";

#[derive(Debug, Clone)]
pub struct KeeperPaths {
    pub keeper_home: PathBuf,
    pub container_dir: PathBuf,
    pub models_dir: PathBuf,
    pub scripts_dir: PathBuf,
    pub caches_dir: PathBuf,
    pub logs_dir: PathBuf,
}

/// Directory overrides given on the command line; they win over env and defaults.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub container_dir: Option<PathBuf>,
    pub models_dir: Option<PathBuf>,
    pub scripts_dir: Option<PathBuf>,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths(overrides: &PathOverrides) -> Result<KeeperPaths> {
    let home = required_home_dir()?;
    let keeper_home = env_or_default_path("DT_KEEPER_HOME", home.join(".dt-keeper"));

    let container_dir = match &overrides.container_dir {
        Some(dir) => dir.clone(),
        None => env_or_default_path("DT_KEEPER_CONTAINER_DIR", home.join(APP_CONTAINER)),
    };
    let documents = container_dir.join("Documents");
    let models_dir = match &overrides.models_dir {
        Some(dir) => dir.clone(),
        None => env_or_default_path("DT_KEEPER_MODELS_DIR", documents.join("Models")),
    };
    let scripts_dir = match &overrides.scripts_dir {
        Some(dir) => dir.clone(),
        None => env_or_default_path("DT_KEEPER_SCRIPTS_DIR", documents.join("Scripts")),
    };
    let caches_dir = caches_dir_for(&container_dir);
    let logs_dir = env_or_default_path("DT_KEEPER_LOGS_DIR", keeper_home.join("logs"));

    Ok(KeeperPaths {
        keeper_home,
        container_dir,
        models_dir,
        scripts_dir,
        caches_dir,
        logs_dir,
    })
}

pub fn caches_dir_for(container_dir: &Path) -> PathBuf {
    container_dir.join("Library").join("Caches")
}
