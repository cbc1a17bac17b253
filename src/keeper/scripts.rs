//! The scripts directory, its manifest and its history.

use crate::error::KeeperError;
use crate::keeper::config::KeeperConfig;
use crate::keeper::entry::ScriptEntry;
use crate::keeper::extract::read_header_metadata;
use crate::keeper::guard::SaveOutcome;
use crate::keeper::history::{GitHistory, HistoryClient, NoHistory};
use crate::keeper::manifest::{JsonManifest, Loaded, MetadataStore, ScriptCodec};
use crate::keeper::paths::KeeperPaths;
use crate::keeper::reconcile::{Reconciliation, reconcile};
use crate::keeper::scanner::{DirScanner, FileScanner, ObservedFile};
use std::path::{Path, PathBuf};

pub struct Snapshot {
    pub loaded: Loaded<ScriptEntry>,
    pub observed: Vec<ObservedFile>,
    pub result: Reconciliation,
}

pub struct ScriptWorkspace {
    dir: PathBuf,
    extension: String,
    manifest_name: String,
    summary_file: String,
    log_limit: usize,
    store: Box<dyn MetadataStore<Entry = ScriptEntry>>,
    scanner: Box<dyn FileScanner>,
    history: Box<dyn HistoryClient>,
}

impl ScriptWorkspace {
    pub fn from_config(cfg: &KeeperConfig, paths: &KeeperPaths) -> Self {
        let dir = paths.scripts_dir.clone();
        let scripts = &cfg.scripts;
        let store = JsonManifest::new(
            dir.join(&scripts.manifest),
            ScriptCodec {
                extension: scripts.extension.clone(),
            },
        );
        let scanner = DirScanner::new(&dir)
            .with_extension(&scripts.extension)
            .excluding(&scripts.manifest);
        let history: Box<dyn HistoryClient> = if scripts.use_history {
            Box::new(
                GitHistory::new(&dir, &scripts.manifest, cfg.history.timeout_secs)
                    .ignoring(&scripts.summary_file),
            )
        } else {
            Box::new(NoHistory)
        };
        Self {
            dir,
            extension: scripts.extension.clone(),
            manifest_name: scripts.manifest.clone(),
            summary_file: scripts.summary_file.clone(),
            log_limit: cfg.history.log_limit,
            store: Box::new(store),
            scanner: Box::new(scanner),
            history,
        }
    }

    #[cfg(test)]
    pub fn with_history(mut self, history: Box<dyn HistoryClient>) -> Self {
        self.history = history;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest_name(&self) -> &str {
        &self.manifest_name
    }

    pub fn manifest_path(&self) -> &Path {
        self.store.path()
    }

    pub fn summary_path(&self) -> PathBuf {
        self.dir.join(&self.summary_file)
    }

    pub fn log_limit(&self) -> usize {
        self.log_limit
    }

    pub fn store(&self) -> &dyn MetadataStore<Entry = ScriptEntry> {
        self.store.as_ref()
    }

    pub fn history(&self) -> &dyn HistoryClient {
        self.history.as_ref()
    }

    pub fn ensure_dir(&self) -> Result<(), KeeperError> {
        if self.dir.is_dir() {
            Ok(())
        } else {
            Err(KeeperError::DataDirMissing(self.dir.clone()))
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let loaded = self.store.load();
        let observed = self.scanner.scan();
        let result = reconcile(&loaded.entries, &observed);
        Snapshot {
            loaded,
            observed,
            result,
        }
    }

    /// New entry for an untracked file: name from the file name, author and
    /// description from its header comments (empty when absent).
    pub fn build_entry(&self, file: &ObservedFile) -> ScriptEntry {
        let header = read_header_metadata(&self.dir.join(&file.name));
        let mut entry = ScriptEntry::synthesized(&file.name, &self.extension);
        entry.description = Some(header.get("description").cloned().unwrap_or_default());
        entry.author = Some(header.get("author").cloned().unwrap_or_default());
        entry
    }

    pub fn save(
        &self,
        entries: &[ScriptEntry],
        message: &str,
    ) -> Result<SaveOutcome, KeeperError> {
        self.store.save(entries, Some(message), self.history.as_ref())
    }

    pub fn save_raw(&self, bytes: &[u8], message: &str) -> Result<SaveOutcome, KeeperError> {
        self.store.save_raw(bytes, Some(message), self.history.as_ref())
    }
}
