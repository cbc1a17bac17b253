//! Manifest mutations. Each takes the current entries plus the observed set
//! and returns a new collection; none of them touch the observed files.

use crate::keeper::entry::DeclaredEntry;
use crate::keeper::reconcile::{observed_index, orphans, reconcile, referenced_keys};
use crate::keeper::scanner::ObservedFile;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct PruneOutcome<E> {
    pub entries: Vec<E>,
    pub removed: Vec<String>,
}

/// Drop every entry with at least one unresolved file reference.
pub fn prune<E: DeclaredEntry>(entries: Vec<E>, observed: &[ObservedFile]) -> PruneOutcome<E> {
    let result = reconcile(&entries, observed);
    let mut removed = Vec::new();
    let mut kept = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        if result.is_missing(i) {
            removed.push(entry.display_name().to_string());
        } else {
            kept.push(entry);
        }
    }
    PruneOutcome {
        entries: kept,
        removed,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SyncSkip {
    AlreadyDeclared { file: String, declared_as: String },
    NotOrphaned { file: String },
}

#[derive(Debug, Clone)]
pub struct SyncOutcome<E> {
    pub entries: Vec<E>,
    pub added: Vec<String>,
    pub skipped: Vec<SyncSkip>,
}

/// Append one entry per orphaned file (or per requested file), built by
/// `build`. Files already declared under any casing are never added twice.
pub fn sync_add<E, F>(
    entries: Vec<E>,
    observed: &[ObservedFile],
    selection: Option<&[String]>,
    mut build: F,
) -> SyncOutcome<E>
where
    E: DeclaredEntry,
    F: FnMut(&ObservedFile) -> E,
{
    let mut declared = referenced_keys(&entries);
    let orphaned = orphans(&declared, observed);
    let mut skipped = Vec::new();

    let requested: Vec<String> = match selection {
        None => orphaned.clone(),
        Some(names) => {
            let mut picked = Vec::new();
            for name in names {
                let key = name.to_lowercase();
                if declared.contains(&key) {
                    let declared_as = entries
                        .iter()
                        .flat_map(|e| e.file_refs())
                        .find(|r| r.value.to_lowercase() == key)
                        .map(|r| r.value.to_string())
                        .unwrap_or_else(|| name.clone());
                    skipped.push(SyncSkip::AlreadyDeclared {
                        file: name.clone(),
                        declared_as,
                    });
                } else if orphaned.iter().any(|o| o == name) {
                    picked.push(name.clone());
                } else {
                    skipped.push(SyncSkip::NotOrphaned { file: name.clone() });
                }
            }
            picked
        }
    };

    let mut entries = entries;
    let mut added = Vec::new();
    for name in requested {
        let key = name.to_lowercase();
        if declared.contains(&key) {
            continue;
        }
        let Some(file) = observed.iter().find(|f| f.name == name) else {
            skipped.push(SyncSkip::NotOrphaned { file: name });
            continue;
        };
        entries.push(build(file));
        declared.insert(key);
        added.push(name);
    }

    SyncOutcome {
        entries,
        added,
        skipped,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub fix_case: bool,
    pub sort: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            fix_case: true,
            sort: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NormalizeChange {
    CaseFixed {
        entry: String,
        field: String,
        from: String,
        to: String,
    },
    Reordered {
        before: Vec<String>,
        after: Vec<String>,
    },
}

impl NormalizeChange {
    pub fn describe(&self) -> String {
        match self {
            Self::CaseFixed { field, from, to, .. } if field == "file" => {
                format!("fix case: {from} -> {to}")
            }
            Self::CaseFixed {
                field, from, to, ..
            } => format!("fix case ({field}): {from} -> {to}"),
            Self::Reordered { .. } => "sort entries alphabetically".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NormalizeOutcome<E> {
    pub entries: Vec<E>,
    pub changes: Vec<NormalizeChange>,
}

impl<E> NormalizeOutcome<E> {
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Rewrite file references to the observed casing and/or sort by display
/// name (case-insensitive, stable).
pub fn normalize<E: DeclaredEntry>(
    entries: Vec<E>,
    observed: &[ObservedFile],
    opts: NormalizeOptions,
) -> NormalizeOutcome<E> {
    let mut entries = entries;
    let mut changes = Vec::new();

    if opts.fix_case {
        let index = observed_index(observed);
        for entry in entries.iter_mut() {
            let rewrites = entry
                .file_refs()
                .into_iter()
                .filter_map(|r| {
                    let actual = index.get(&r.value.to_lowercase())?;
                    (*actual != r.value).then(|| {
                        (r.field.to_string(), r.value.to_string(), (*actual).to_string())
                    })
                })
                .collect::<Vec<_>>();
            for (field, from, to) in rewrites {
                entry.set_file_ref(&field, &to);
                changes.push(NormalizeChange::CaseFixed {
                    entry: entry.display_name().to_string(),
                    field,
                    from,
                    to,
                });
            }
        }
    }

    if opts.sort {
        let before = entries
            .iter()
            .map(|e| e.display_name().to_string())
            .collect::<Vec<_>>();
        entries.sort_by_cached_key(|e| e.display_name().to_lowercase());
        let after = entries
            .iter()
            .map(|e| e.display_name().to_string())
            .collect::<Vec<_>>();
        if before != after {
            changes.push(NormalizeChange::Reordered { before, after });
        }
    }

    NormalizeOutcome { entries, changes }
}
