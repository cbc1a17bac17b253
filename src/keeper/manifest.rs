//! JSON-array manifests on disk.

use crate::error::KeeperError;
use crate::keeper::entry::{DeclaredEntry, ModelEntry, ScriptEntry};
use crate::keeper::guard::{
    AtomicWriter, ManifestWriter, SaveOutcome, persist_document, persist_raw,
};
use crate::keeper::history::HistoryClient;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Absent,
    Parsed,
    Malformed(String),
}

#[derive(Debug, Clone)]
pub struct Loaded<E> {
    pub entries: Vec<E>,
    /// One diagnostic per array element that could not be decoded.
    pub rejected: Vec<String>,
    pub status: LoadStatus,
}

impl<E> Loaded<E> {
    pub fn empty(status: LoadStatus) -> Self {
        Self {
            entries: Vec::new(),
            rejected: Vec::new(),
            status,
        }
    }

    /// Writing would drop content that could not be read.
    pub fn ensure_writable(&self, path: &Path) -> Result<(), KeeperError> {
        if let LoadStatus::Malformed(reason) = &self.status {
            return Err(KeeperError::UnsafeOverwrite {
                path: path.to_path_buf(),
                reason: format!("current content is unreadable ({reason})"),
            });
        }
        if !self.rejected.is_empty() {
            return Err(KeeperError::UnsafeOverwrite {
                path: path.to_path_buf(),
                reason: format!("{} element(s) could not be decoded", self.rejected.len()),
            });
        }
        Ok(())
    }
}

pub trait EntryCodec {
    type Entry: DeclaredEntry + Clone;

    fn decode(&self, object: Map<String, Value>) -> Result<Self::Entry, String>;
    fn encode(&self, entry: &Self::Entry) -> Map<String, Value>;
}

#[derive(Debug, Clone)]
pub struct ScriptCodec {
    pub extension: String,
}

impl EntryCodec for ScriptCodec {
    type Entry = ScriptEntry;

    fn decode(&self, object: Map<String, Value>) -> Result<ScriptEntry, String> {
        ScriptEntry::from_object(object, &self.extension)
    }

    fn encode(&self, entry: &ScriptEntry) -> Map<String, Value> {
        entry.to_object()
    }
}

#[derive(Debug, Clone)]
pub struct ModelCodec {
    pub ref_keys: Vec<String>,
}

impl EntryCodec for ModelCodec {
    type Entry = ModelEntry;

    fn decode(&self, object: Map<String, Value>) -> Result<ModelEntry, String> {
        Ok(ModelEntry::new(object, &self.ref_keys))
    }

    fn encode(&self, entry: &ModelEntry) -> Map<String, Value> {
        entry.to_object()
    }
}

pub trait MetadataStore {
    type Entry: DeclaredEntry + Clone;

    fn path(&self) -> &Path;

    fn exists(&self) -> bool {
        self.path().exists()
    }

    fn load(&self) -> Loaded<Self::Entry>;

    /// Decode a document that did not come from disk (e.g. a past revision).
    fn parse(&self, bytes: &[u8]) -> Loaded<Self::Entry>;

    fn save(
        &self,
        entries: &[Self::Entry],
        message: Option<&str>,
        history: &dyn HistoryClient,
    ) -> Result<SaveOutcome, KeeperError>;

    /// Replace the manifest with `bytes` verbatim, under the same guard as `save`.
    fn save_raw(
        &self,
        bytes: &[u8],
        message: Option<&str>,
        history: &dyn HistoryClient,
    ) -> Result<SaveOutcome, KeeperError>;
}

pub struct JsonManifest<C> {
    path: PathBuf,
    codec: C,
    writer: Box<dyn ManifestWriter>,
}

impl<C: EntryCodec> JsonManifest<C> {
    pub fn new(path: impl Into<PathBuf>, codec: C) -> Self {
        Self {
            path: path.into(),
            codec,
            writer: Box::new(AtomicWriter),
        }
    }

    #[cfg(test)]
    pub fn with_writer(mut self, writer: Box<dyn ManifestWriter>) -> Self {
        self.writer = writer;
        self
    }

    fn decode_text(&self, text: &str) -> Loaded<C::Entry> {
        let document: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(
                    file = %self.path.display(),
                    error = %err,
                    "manifest is not valid JSON"
                );
                return Loaded::empty(LoadStatus::Malformed(err.to_string()));
            }
        };
        let Value::Array(items) = document else {
            tracing::warn!(file = %self.path.display(), "manifest top level is not an array");
            return Loaded::empty(LoadStatus::Malformed(
                "top-level value is not an array".to_string(),
            ));
        };

        let mut loaded = Loaded::empty(LoadStatus::Parsed);
        for (i, item) in items.into_iter().enumerate() {
            let decoded = match item {
                Value::Object(object) => self.codec.decode(object),
                other => Err(format!("expected an object, found {}", json_kind(&other))),
            };
            match decoded {
                Ok(entry) => loaded.entries.push(entry),
                Err(reason) => {
                    tracing::warn!(
                        file = %self.path.display(),
                        index = i,
                        reason = %reason,
                        "skipping manifest element"
                    );
                    loaded.rejected.push(format!("element {i}: {reason}"));
                }
            }
        }
        loaded
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl<C: EntryCodec> MetadataStore for JsonManifest<C> {
    type Entry = C::Entry;

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Loaded<C::Entry> {
        match fs::read(&self.path) {
            Ok(bytes) => self.parse(&bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Loaded::empty(LoadStatus::Absent)
            }
            Err(err) => {
                tracing::warn!(file = %self.path.display(), error = %err, "manifest unreadable");
                Loaded::empty(LoadStatus::Malformed(err.to_string()))
            }
        }
    }

    fn parse(&self, bytes: &[u8]) -> Loaded<C::Entry> {
        match std::str::from_utf8(bytes) {
            Ok(text) => self.decode_text(text),
            Err(err) => Loaded::empty(LoadStatus::Malformed(format!("not UTF-8: {err}"))),
        }
    }

    fn save(
        &self,
        entries: &[C::Entry],
        message: Option<&str>,
        history: &dyn HistoryClient,
    ) -> Result<SaveOutcome, KeeperError> {
        self.load().ensure_writable(&self.path)?;
        let document = Value::Array(
            entries
                .iter()
                .map(|e| Value::Object(self.codec.encode(e)))
                .collect(),
        );
        persist_document(&self.path, &document, message, self.writer.as_ref(), history)
    }

    fn save_raw(
        &self,
        bytes: &[u8],
        message: Option<&str>,
        history: &dyn HistoryClient,
    ) -> Result<SaveOutcome, KeeperError> {
        let incoming = self.parse(bytes);
        if let LoadStatus::Malformed(reason) = incoming.status {
            return Err(KeeperError::InvalidManifest {
                path: self.path.clone(),
                reason,
            });
        }
        persist_raw(&self.path, bytes, message, self.writer.as_ref(), history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keeper::history::NoHistory;
    use serde_json::json;
    use tempfile::tempdir;

    fn scripts(dir: &Path) -> JsonManifest<ScriptCodec> {
        JsonManifest::new(
            dir.join("custom_scripts.json"),
            ScriptCodec {
                extension: "js".to_string(),
            },
        )
    }

    #[test]
    fn absent_manifest_loads_empty() {
        let tmp = tempdir().expect("tempdir");
        let loaded = scripts(tmp.path()).load();
        assert_eq!(loaded.status, LoadStatus::Absent);
        assert!(loaded.entries.is_empty());
    }

    #[test]
    fn malformed_manifest_loads_empty_and_is_never_overwritten() {
        let tmp = tempdir().expect("tempdir");
        let store = scripts(tmp.path());
        fs::write(store.path(), "{ not json").expect("seed");

        let loaded = store.load();
        assert!(matches!(loaded.status, LoadStatus::Malformed(_)));
        assert!(loaded.entries.is_empty());

        let err = store.save(&[], Some("x"), &NoHistory).expect_err("refused");
        assert!(matches!(err, KeeperError::UnsafeOverwrite { .. }));
        assert_eq!(fs::read_to_string(store.path()).expect("read"), "{ not json");
    }

    #[test]
    fn non_array_top_level_is_malformed() {
        let tmp = tempdir().expect("tempdir");
        let store = scripts(tmp.path());
        fs::write(store.path(), "{\"name\": \"x\"}").expect("seed");
        assert!(matches!(store.load().status, LoadStatus::Malformed(_)));
    }

    #[test]
    fn bad_elements_are_rejected_individually() {
        let tmp = tempdir().expect("tempdir");
        let store = scripts(tmp.path());
        fs::write(
            store.path(),
            json!([{"name": "A", "file": "a.js"}, 3, {"name": "no file"}]).to_string(),
        )
        .expect("seed");
        let loaded = store.load();
        assert_eq!(loaded.status, LoadStatus::Parsed);
        assert_eq!(loaded.entries.len(), 1);
        assert_eq!(loaded.rejected.len(), 2);
        assert!(loaded.rejected[0].contains("a number"));
        assert!(store.save(&loaded.entries, None, &NoHistory).is_err());
    }

    struct DiskFull;

    impl ManifestWriter for DiskFull {
        fn write(&self, _path: &Path, _bytes: &[u8]) -> std::io::Result<()> {
            Err(std::io::Error::other("disk full"))
        }
    }

    #[test]
    fn failed_save_keeps_previous_manifest() {
        let tmp = tempdir().expect("tempdir");
        let store = scripts(tmp.path()).with_writer(Box::new(DiskFull));
        let original = json!([{"name": "A", "file": "a.js"}]).to_string();
        fs::write(store.path(), &original).expect("seed");

        let loaded = store.load();
        let err = store
            .save(&loaded.entries, Some("x"), &NoHistory)
            .expect_err("write fails");
        match err {
            KeeperError::WriteFailed {
                restored, backup, ..
            } => {
                assert!(restored);
                assert!(backup.is_some_and(|b| b.exists()));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs::read_to_string(store.path()).expect("read"), original);
    }

    #[test]
    fn save_then_load_preserves_entries_and_key_order() {
        let tmp = tempdir().expect("tempdir");
        let store = scripts(tmp.path());
        let raw = json!([{
            "name": "Full",
            "file": "full.js",
            "zUnknown": 1,
            "aUnknown": [true]
        }]);
        fs::write(store.path(), raw.to_string()).expect("seed");

        let loaded = store.load();
        store.save(&loaded.entries, None, &NoHistory).expect("save");
        let text = fs::read_to_string(store.path()).expect("read");
        let z = text.find("zUnknown").expect("z");
        let a = text.find("aUnknown").expect("a");
        assert!(z < a);
        assert_eq!(store.load().entries, loaded.entries);
    }

    #[test]
    fn model_manifest_round_trips_raw_objects() {
        let tmp = tempdir().expect("tempdir");
        let store = JsonManifest::new(
            tmp.path().join("custom.json"),
            ModelCodec {
                ref_keys: vec!["file".to_string(), "autoencoder".to_string()],
            },
        );
        let raw = json!([{"name": "M", "file": "m.ckpt", "version": "sdxl", "autoencoder": "ae.ckpt"}]);
        fs::write(store.path(), raw.to_string()).expect("seed");
        let loaded = store.load();
        assert_eq!(loaded.entries[0].file_refs().len(), 2);
        store.save(&loaded.entries, None, &NoHistory).expect("save");
        let back: Value = serde_json::from_str(&fs::read_to_string(store.path()).expect("read"))
            .expect("json");
        assert_eq!(back, raw);
    }

    #[test]
    fn save_raw_rejects_non_array_content() {
        let tmp = tempdir().expect("tempdir");
        let store = scripts(tmp.path());
        fs::write(store.path(), "[]\n").expect("seed");
        let err = store
            .save_raw(b"{\"a\": 1}", None, &NoHistory)
            .expect_err("refused");
        assert!(matches!(err, KeeperError::InvalidManifest { .. }));
        assert_eq!(fs::read_to_string(store.path()).expect("read"), "[]\n");
    }
}
