//! Declared-vs-observed reconciliation.
//!
//! Everything here is a pure function of the two input collections. Matching
//! is always on the lower-cased file name, and every collection in the result
//! is ordered (by entry index or by name) so repeated calls compare equal.

use crate::keeper::entry::DeclaredEntry;
use crate::keeper::scanner::ObservedFile;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedRef {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingEntry {
    pub index: usize,
    pub name: String,
    pub unresolved: Vec<UnresolvedRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseMismatch {
    pub index: usize,
    pub field: String,
    pub declared: String,
    pub actual: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Reconciliation {
    pub valid: Vec<usize>,
    pub missing: Vec<MissingEntry>,
    pub orphaned: Vec<String>,
    pub case_mismatches: Vec<CaseMismatch>,
    pub duplicates: Vec<String>,
}

impl Reconciliation {
    pub fn total_entries(&self) -> usize {
        self.valid.len() + self.missing.len()
    }

    pub fn is_missing(&self, index: usize) -> bool {
        self.missing.iter().any(|m| m.index == index)
    }
}

/// Lower-cased name to actual observed name. When two files differ only in
/// case, the first in name order wins.
pub fn observed_index(observed: &[ObservedFile]) -> BTreeMap<String, &str> {
    let mut out = BTreeMap::new();
    for file in observed {
        out.entry(file.key()).or_insert(file.name.as_str());
    }
    out
}

pub fn referenced_keys<E: DeclaredEntry>(entries: &[E]) -> BTreeSet<String> {
    entries
        .iter()
        .flat_map(|e| e.file_refs().into_iter().map(|r| r.value.to_lowercase()))
        .collect()
}

pub fn orphans(referenced: &BTreeSet<String>, observed: &[ObservedFile]) -> Vec<String> {
    let mut out = observed
        .iter()
        .filter(|f| !referenced.contains(&f.key()))
        .map(|f| f.name.clone())
        .collect::<Vec<_>>();
    out.sort();
    out
}

pub fn duplicates<E: DeclaredEntry>(entries: &[E]) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for key in entries.iter().filter_map(|e| e.primary_key()) {
        *counts.entry(key).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(key, _)| key)
        .collect()
}

pub fn reconcile<E: DeclaredEntry>(entries: &[E], observed: &[ObservedFile]) -> Reconciliation {
    let index = observed_index(observed);
    let mut result = Reconciliation::default();

    for (i, entry) in entries.iter().enumerate() {
        let mut unresolved = Vec::new();
        for file_ref in entry.file_refs() {
            match index.get(&file_ref.value.to_lowercase()) {
                Some(actual) if *actual != file_ref.value => {
                    result.case_mismatches.push(CaseMismatch {
                        index: i,
                        field: file_ref.field.to_string(),
                        declared: file_ref.value.to_string(),
                        actual: (*actual).to_string(),
                    });
                }
                Some(_) => {}
                None => unresolved.push(UnresolvedRef {
                    field: file_ref.field.to_string(),
                    value: file_ref.value.to_string(),
                }),
            }
        }

        if unresolved.is_empty() {
            result.valid.push(i);
        } else {
            result.missing.push(MissingEntry {
                index: i,
                name: entry.display_name().to_string(),
                unresolved,
            });
        }
    }

    result.orphaned = orphans(&referenced_keys(entries), observed);
    result.duplicates = duplicates(entries);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keeper::entry::{ModelEntry, ScriptEntry};
    use serde_json::{Value, json};

    fn script(file: &str) -> ScriptEntry {
        ScriptEntry::synthesized(file, "js")
    }

    fn observed(names: &[&str]) -> Vec<ObservedFile> {
        let mut out = names
            .iter()
            .map(|n| ObservedFile {
                name: (*n).to_string(),
                size: 1,
            })
            .collect::<Vec<_>>();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    fn model(value: Value) -> ModelEntry {
        let keys = ["file", "autoencoder", "text_encoder", "clip_encoder"]
            .iter()
            .map(|k| (*k).to_string())
            .collect::<Vec<_>>();
        ModelEntry::new(value.as_object().cloned().expect("object"), &keys)
    }

    #[test]
    fn case_mismatch_counts_as_present() {
        let result = reconcile(&[script("test.js")], &observed(&["Test.js"]));
        assert!(result.missing.is_empty());
        assert!(result.orphaned.is_empty());
        assert_eq!(result.valid, vec![0]);
        assert_eq!(result.case_mismatches.len(), 1);
        assert_eq!(result.case_mismatches[0].declared, "test.js");
        assert_eq!(result.case_mismatches[0].actual, "Test.js");
    }

    #[test]
    fn undeclared_file_is_orphaned() {
        let result = reconcile::<ScriptEntry>(&[], &observed(&["orphaned.js"]));
        assert_eq!(result.orphaned, vec!["orphaned.js"]);
        assert_eq!(result.total_entries(), 0);
    }

    #[test]
    fn duplicate_keys_are_reported_once() {
        let result = reconcile(&[script("a.js"), script("A.js")], &observed(&["a.js"]));
        assert_eq!(result.duplicates, vec!["a.js"]);
        assert_eq!(result.valid, vec![0, 1]);
    }

    #[test]
    fn duplicate_with_one_missing_copy_keeps_per_entry_classification() {
        let entries = vec![
            model(json!({"name": "one", "file": "m.ckpt"})),
            model(json!({"name": "two", "file": "m.ckpt", "autoencoder": "gone.ckpt"})),
        ];
        let result = reconcile(&entries, &observed(&["m.ckpt"]));
        assert_eq!(result.valid, vec![0]);
        assert_eq!(result.missing.len(), 1);
        assert_eq!(result.duplicates, vec!["m.ckpt"]);
    }

    #[test]
    fn multi_field_entry_needs_every_reference() {
        let entries = vec![model(json!({"name": "m", "file": "m.ckpt", "autoencoder": "ae.ckpt"}))];
        let result = reconcile(&entries, &observed(&["m.ckpt"]));
        assert!(result.valid.is_empty());
        assert_eq!(result.missing.len(), 1);
        assert_eq!(
            result.missing[0].unresolved,
            vec![UnresolvedRef {
                field: "autoencoder".to_string(),
                value: "ae.ckpt".to_string()
            }]
        );
        assert!(result.orphaned.is_empty());
    }

    #[test]
    fn missing_entry_names_every_unresolved_field() {
        let entries = vec![model(json!({
            "file": "x.ckpt",
            "text_encoder": "te.ckpt",
            "clip_encoder": "clip.ckpt"
        }))];
        let result = reconcile(&entries, &observed(&["clip.ckpt"]));
        let fields = result.missing[0]
            .unresolved
            .iter()
            .map(|u| u.field.as_str())
            .collect::<Vec<_>>();
        assert_eq!(fields, vec!["file", "text_encoder"]);
        assert_eq!(result.missing[0].name, "x.ckpt");
    }

    #[test]
    fn entry_without_references_is_valid() {
        let entries = vec![model(json!({"name": "bare"}))];
        let result = reconcile(&entries, &observed(&[]));
        assert_eq!(result.valid, vec![0]);
    }

    #[test]
    fn valid_and_missing_partition_all_entries() {
        let entries = vec![
            script("a.js"),
            script("b.js"),
            script("C.js"),
            script("a.js"),
            script("gone.js"),
        ];
        let files = observed(&["a.js", "c.js", "extra.js"]);
        let result = reconcile(&entries, &files);

        let mut seen = result.valid.clone();
        seen.extend(result.missing.iter().map(|m| m.index));
        seen.sort();
        assert_eq!(seen, (0..entries.len()).collect::<Vec<_>>());
        for m in &result.missing {
            assert!(!result.valid.contains(&m.index));
        }
        assert_eq!(result.orphaned, vec!["extra.js"]);
    }

    #[test]
    fn repeated_reconciliation_is_identical() {
        let entries = vec![script("b.js"), script("A.js"), script("z.js")];
        let files = observed(&["a.js", "q.js", "b.js", "r.js"]);
        let first = reconcile(&entries, &files);
        for _ in 0..3 {
            assert_eq!(reconcile(&entries, &files), first);
        }
    }
}
