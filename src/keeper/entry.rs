//! Declared manifest entries and their JSON object form.
//!
//! Core logic works on snake_case field names only; the camelCase spellings
//! the application writes exist solely in [`WIRE_KEYS`], consulted when an
//! entry crosses the JSON boundary.

use serde_json::{Map, Value};

/// Canonical (snake_case) field name to on-disk (camelCase) key.
pub const WIRE_KEYS: &[(&str, &str)] = &[
    ("base_color", "baseColor"),
    ("file_path", "filePath"),
    ("is_sample_duplicate", "isSampleDuplicate"),
];

pub fn to_wire_key(canonical: &str) -> &str {
    WIRE_KEYS
        .iter()
        .find(|(c, _)| *c == canonical)
        .map(|(_, w)| *w)
        .unwrap_or(canonical)
}

pub fn to_canonical_key(wire: &str) -> &str {
    WIRE_KEYS
        .iter()
        .find(|(_, w)| *w == wire)
        .map(|(c, _)| *c)
        .unwrap_or(wire)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRef<'a> {
    pub field: &'a str,
    pub value: &'a str,
}

pub trait DeclaredEntry {
    fn display_name(&self) -> &str;

    /// File-reference fields in declaration order. The first is the primary key.
    fn file_refs(&self) -> Vec<FileRef<'_>>;

    /// Rewrite one file-reference field; unknown fields are ignored.
    fn set_file_ref(&mut self, field: &str, value: &str);

    fn primary_key(&self) -> Option<String> {
        self.file_refs().first().map(|r| r.value.to_lowercase())
    }
}

/// Display name for a file: extension stripped, `-`/`_` turned into spaces,
/// title-cased.
pub fn display_name_for_file(file_name: &str, extension: &str) -> String {
    let suffix = format!(".{extension}");
    let cut = file_name.len().saturating_sub(suffix.len());
    let stem = if cut > 0
        && file_name.is_char_boundary(cut)
        && file_name[cut..].eq_ignore_ascii_case(&suffix)
    {
        &file_name[..cut]
    } else {
        file_name
    };
    title_case(&stem.replace(['-', '_'], " "))
}

fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_cased = false;
    for ch in input.chars() {
        if ch.is_alphabetic() {
            if prev_cased {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_cased = true;
        } else {
            out.push(ch);
            prev_cased = false;
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScriptEntry {
    pub name: String,
    pub file: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub tags: Option<Vec<String>>,
    pub images: Option<Vec<Value>>,
    pub base_color: Option<String>,
    pub favicon: Option<String>,
    pub file_path: Option<String>,
    pub kind: Option<String>,
    pub is_sample_duplicate: Option<bool>,
    /// Unrecognized keys, in document order, keyed by their on-disk spelling.
    pub extra: Map<String, Value>,
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(ToOwned::to_owned))
        .collect()
}

impl ScriptEntry {
    pub fn synthesized(file: &str, extension: &str) -> Self {
        Self {
            name: display_name_for_file(file, extension),
            file: file.to_string(),
            ..Self::default()
        }
    }

    pub fn from_object(object: Map<String, Value>, extension: &str) -> Result<Self, String> {
        let mut entry = ScriptEntry::default();
        let mut name = None;
        let mut file = None;

        for (key, value) in object {
            if value.is_null() {
                continue;
            }
            // Known fields with an unexpected JSON type fall through to `extra`
            // so they are written back untouched.
            let kept = match to_canonical_key(&key) {
                "name" => value.as_str().map(|v| name = Some(v.to_string())),
                "file" => value.as_str().map(|v| file = Some(v.to_string())),
                "description" => value
                    .as_str()
                    .map(|v| entry.description = Some(v.to_string())),
                "author" => value.as_str().map(|v| entry.author = Some(v.to_string())),
                "tags" => string_list(&value).map(|v| entry.tags = Some(v)),
                "images" => value
                    .as_array()
                    .map(|v| entry.images = Some(v.clone())),
                "base_color" => value
                    .as_str()
                    .map(|v| entry.base_color = Some(v.to_string())),
                "favicon" => value.as_str().map(|v| entry.favicon = Some(v.to_string())),
                "file_path" => value
                    .as_str()
                    .map(|v| entry.file_path = Some(v.to_string())),
                "type" => value.as_str().map(|v| entry.kind = Some(v.to_string())),
                "is_sample_duplicate" => value
                    .as_bool()
                    .map(|v| entry.is_sample_duplicate = Some(v)),
                _ => None,
            };
            if kept.is_none() {
                entry.extra.insert(key, value);
            }
        }

        let Some(file) = file else {
            return Err("entry has no string `file` field".to_string());
        };
        entry.name = name.unwrap_or_else(|| display_name_for_file(&file, extension));
        entry.file = file;
        Ok(entry)
    }

    pub fn to_object(&self) -> Map<String, Value> {
        let mut out = Map::new();
        let mut put = |canonical: &str, value: Option<Value>| {
            if let Some(value) = value {
                out.insert(to_wire_key(canonical).to_string(), value);
            }
        };
        put("name", Some(Value::from(self.name.clone())));
        put("file", Some(Value::from(self.file.clone())));
        put("description", self.description.clone().map(Value::from));
        put("author", self.author.clone().map(Value::from));
        put("tags", self.tags.clone().map(Value::from));
        put("images", self.images.clone().map(Value::Array));
        put("base_color", self.base_color.clone().map(Value::from));
        put("favicon", self.favicon.clone().map(Value::from));
        put("file_path", self.file_path.clone().map(Value::from));
        put("type", self.kind.clone().map(Value::from));
        put("is_sample_duplicate", self.is_sample_duplicate.map(Value::from));
        for (key, value) in &self.extra {
            if !value.is_null() {
                out.insert(key.clone(), value.clone());
            }
        }
        out
    }
}

impl DeclaredEntry for ScriptEntry {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn file_refs(&self) -> Vec<FileRef<'_>> {
        vec![FileRef {
            field: "file",
            value: &self.file,
        }]
    }

    fn set_file_ref(&mut self, field: &str, value: &str) {
        if field == "file" {
            self.file = value.to_string();
        }
    }
}

/// A model-config entry kept as its raw object; only the configured
/// reference keys are interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEntry {
    object: Map<String, Value>,
    ref_keys: Vec<String>,
}

impl ModelEntry {
    pub fn new(object: Map<String, Value>, ref_keys: &[String]) -> Self {
        Self {
            object,
            ref_keys: ref_keys.to_vec(),
        }
    }

    pub fn object(&self) -> &Map<String, Value> {
        &self.object
    }

    pub fn to_object(&self) -> Map<String, Value> {
        self.object
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl DeclaredEntry for ModelEntry {
    fn display_name(&self) -> &str {
        self.object
            .get("name")
            .and_then(Value::as_str)
            .or_else(|| self.object.get("file").and_then(Value::as_str))
            .unwrap_or("unknown")
    }

    fn file_refs(&self) -> Vec<FileRef<'_>> {
        self.ref_keys
            .iter()
            .filter_map(|key| {
                let value = self.object.get(key)?.as_str()?;
                Some(FileRef {
                    field: key.as_str(),
                    value,
                })
            })
            .collect()
    }

    fn set_file_ref(&mut self, field: &str, value: &str) {
        if self.ref_keys.iter().any(|k| k == field) {
            self.object
                .insert(field.to_string(), Value::from(value.to_string()));
        }
    }
}
