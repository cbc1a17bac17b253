use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const HEADER_LINES: usize = 20;

/// `// key: value` comments from the top of a script. Only `name`, `author`,
/// `description` and `version` (also spelled `v`) are kept.
pub fn header_metadata(source: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for line in source.lines().take(HEADER_LINES) {
        let Some(comment) = line.trim().strip_prefix("//") else {
            continue;
        };
        let Some((key, value)) = comment.trim().split_once(':') else {
            continue;
        };
        let key = match key.trim().to_lowercase().as_str() {
            "v" | "version" => "version".to_string(),
            k @ ("name" | "author" | "description") => k.to_string(),
            _ => continue,
        };
        out.insert(key, value.trim().to_string());
    }
    out
}

pub fn read_header_metadata(path: &Path) -> BTreeMap<String, String> {
    match fs::read_to_string(path) {
        Ok(source) => header_metadata(&source),
        Err(err) => {
            tracing::warn!(file = %path.display(), error = %err, "could not read script header");
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::header_metadata;

    #[test]
    fn known_keys_are_read_from_line_comments() {
        let got = header_metadata(
            "// Name: Upscaler\n// author: Jane\n//description: Makes things big: really\n// v: 1.2\n// license: MIT\nconst x = 1;\n",
        );
        assert_eq!(got.get("name").map(String::as_str), Some("Upscaler"));
        assert_eq!(got.get("author").map(String::as_str), Some("Jane"));
        assert_eq!(
            got.get("description").map(String::as_str),
            Some("Makes things big: really")
        );
        assert_eq!(got.get("version").map(String::as_str), Some("1.2"));
        assert!(!got.contains_key("license"));
    }

    #[test]
    fn only_the_first_twenty_lines_count() {
        let mut source = "\n".repeat(20);
        source.push_str("// author: late\n");
        assert!(header_metadata(&source).is_empty());
    }

    #[test]
    fn block_comments_and_code_are_ignored() {
        let got = header_metadata("/* author: nope */\nlet a = 'author: nope';\n");
        assert!(got.is_empty());
    }
}
