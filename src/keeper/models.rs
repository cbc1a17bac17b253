//! The models directory and its four model-config manifests.

use crate::error::KeeperError;
use crate::keeper::config::{KeeperConfig, ModelManifestKind};
use crate::keeper::entry::ModelEntry;
use crate::keeper::guard::SaveOutcome;
use crate::keeper::history::{HistoryClient, NoHistory};
use crate::keeper::manifest::{JsonManifest, LoadStatus, Loaded, MetadataStore, ModelCodec};
use crate::keeper::mutate::prune;
use crate::keeper::paths::KeeperPaths;
use crate::keeper::reconcile::{Reconciliation, orphans, reconcile, referenced_keys};
use crate::keeper::scanner::{DirScanner, FileScanner, ObservedFile};
use crate::keeper::usage::{ModelUsage, model_usage};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub struct ModelManifest {
    pub kind: ModelManifestKind,
    store: JsonManifest<ModelCodec>,
}

#[derive(Debug, Clone)]
pub struct ManifestCheck {
    pub file: String,
    pub loaded: Loaded<ModelEntry>,
    pub result: Reconciliation,
}

impl ManifestCheck {
    pub fn is_clean(&self) -> bool {
        self.result.missing.is_empty()
    }

    pub fn summary(&self) -> String {
        let total = self.result.total_entries();
        if total == 0 {
            "not found or empty".to_string()
        } else if self.is_clean() {
            format!("{} entries OK", self.result.valid.len())
        } else {
            format!(
                "{}/{} valid, {} missing",
                self.result.valid.len(),
                total,
                self.result.missing.len()
            )
        }
    }
}

#[derive(Debug, Clone)]
pub struct PruneReport {
    pub file: String,
    pub removed: Vec<String>,
    pub outcome: Option<SaveOutcome>,
}

pub struct ModelLibrary {
    dir: PathBuf,
    extension: String,
    manifests: Vec<ModelManifest>,
    history: Box<dyn HistoryClient>,
}

impl ModelLibrary {
    pub fn from_config(cfg: &KeeperConfig, paths: &KeeperPaths) -> Self {
        let dir = paths.models_dir.clone();
        let manifests = cfg
            .models
            .manifests
            .iter()
            .map(|kind| ModelManifest {
                kind: kind.clone(),
                store: JsonManifest::new(
                    dir.join(&kind.file),
                    ModelCodec {
                        ref_keys: kind.refs.clone(),
                    },
                ),
            })
            .collect();
        Self {
            dir,
            extension: cfg.models.extension.clone(),
            manifests,
            history: Box::new(NoHistory),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifests(&self) -> &[ModelManifest] {
        &self.manifests
    }

    pub fn ensure_dir(&self) -> Result<(), KeeperError> {
        if self.dir.is_dir() {
            Ok(())
        } else {
            Err(KeeperError::DataDirMissing(self.dir.clone()))
        }
    }

    /// Every regular file in the models directory; references may point at
    /// any of them.
    pub fn all_files(&self) -> Vec<ObservedFile> {
        DirScanner::new(&self.dir).scan()
    }

    pub fn model_files(&self) -> Vec<ObservedFile> {
        DirScanner::new(&self.dir)
            .with_extension(&self.extension)
            .scan()
    }

    pub fn check(&self) -> Vec<ManifestCheck> {
        let observed = self.all_files();
        self.manifests
            .iter()
            .map(|m| {
                let loaded = m.store.load();
                let result = reconcile(&loaded.entries, &observed);
                ManifestCheck {
                    file: m.kind.file.clone(),
                    loaded,
                    result,
                }
            })
            .collect()
    }

    /// Remove entries with unresolved references from every manifest that
    /// has any. Unreadable manifests are refused, not rewritten.
    pub fn prune_all(&self) -> Vec<(String, Result<PruneReport, KeeperError>)> {
        let observed = self.all_files();
        let mut out = Vec::new();
        for m in &self.manifests {
            let loaded = m.store.load();
            if loaded.status == LoadStatus::Absent {
                continue;
            }
            let result = reconcile(&loaded.entries, &observed);
            if result.missing.is_empty() {
                continue;
            }
            let file = m.kind.file.clone();
            let report = loaded.ensure_writable(m.store.path()).and_then(|_| {
                let pruned = prune(loaded.entries, &observed);
                let outcome = m.store.save(&pruned.entries, None, self.history.as_ref())?;
                Ok(PruneReport {
                    file: file.clone(),
                    removed: pruned.removed,
                    outcome: Some(outcome),
                })
            });
            out.push((file, report));
        }
        out
    }

    /// Model files no manifest references, matched case-insensitively across
    /// all manifests.
    pub fn orphans(&self) -> Vec<String> {
        let mut referenced = BTreeSet::new();
        for m in &self.manifests {
            let loaded = m.store.load();
            referenced.extend(referenced_keys(&loaded.entries));
        }
        orphans(&referenced, &self.model_files())
    }

    pub fn usage(&self) -> ModelUsage {
        model_usage(&self.model_files(), &self.extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn library(dir: &Path) -> ModelLibrary {
        let paths = KeeperPaths {
            keeper_home: dir.join("home"),
            container_dir: dir.to_path_buf(),
            models_dir: dir.to_path_buf(),
            scripts_dir: dir.join("scripts"),
            caches_dir: dir.join("caches"),
            logs_dir: dir.join("logs"),
        };
        ModelLibrary::from_config(&KeeperConfig::default(), &paths)
    }

    fn seed(dir: &Path) {
        for name in ["base.ckpt", "ae.ckpt", "style_lora_f16.ckpt", "stray.ckpt"] {
            fs::write(dir.join(name), vec![0u8; 8]).expect("write");
        }
        fs::write(
            dir.join("custom.json"),
            json!([
                {"name": "Base", "file": "base.ckpt", "autoencoder": "ae.ckpt"},
                {"name": "Gone", "file": "gone.ckpt"}
            ])
            .to_string(),
        )
        .expect("write");
        fs::write(
            dir.join("custom_lora.json"),
            json!([{"name": "Style", "file": "Style_LoRA_f16.ckpt"}]).to_string(),
        )
        .expect("write");
    }

    #[test]
    fn check_summarizes_each_manifest() {
        let tmp = tempdir().expect("tempdir");
        seed(tmp.path());
        let checks = library(tmp.path()).check();
        let summaries = checks
            .iter()
            .map(|c| (c.file.as_str(), c.summary()))
            .collect::<Vec<_>>();
        assert_eq!(
            summaries,
            vec![
                ("custom.json", "1/2 valid, 1 missing".to_string()),
                ("custom_lora.json", "1 entries OK".to_string()),
                ("custom_controlnet.json", "not found or empty".to_string()),
                ("custom_textual_inversions.json", "not found or empty".to_string()),
            ]
        );
    }

    #[test]
    fn orphans_span_all_manifests_case_insensitively() {
        let tmp = tempdir().expect("tempdir");
        seed(tmp.path());
        assert_eq!(library(tmp.path()).orphans(), vec!["stray.ckpt"]);
    }

    #[test]
    fn prune_all_rewrites_only_dirty_manifests() {
        let tmp = tempdir().expect("tempdir");
        seed(tmp.path());
        let lora_before = fs::read(tmp.path().join("custom_lora.json")).expect("read");

        let reports = library(tmp.path()).prune_all();
        assert_eq!(reports.len(), 1);
        let (file, report) = &reports[0];
        assert_eq!(file, "custom.json");
        assert_eq!(report.as_ref().expect("pruned").removed, vec!["Gone"]);

        assert!(library(tmp.path()).check().iter().all(ManifestCheck::is_clean));
        assert_eq!(
            fs::read(tmp.path().join("custom_lora.json")).expect("read"),
            lora_before
        );
    }

    #[test]
    fn usage_splits_loras() {
        let tmp = tempdir().expect("tempdir");
        seed(tmp.path());
        let usage = library(tmp.path()).usage();
        assert_eq!(usage.loras, 8);
        assert_eq!(usage.models, 24);
    }
}
