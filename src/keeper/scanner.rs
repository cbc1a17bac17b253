use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedFile {
    pub name: String,
    pub size: u64,
}

impl ObservedFile {
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

pub trait FileScanner {
    /// Immediate files of the managed directory, sorted by name.
    fn scan(&self) -> Vec<ObservedFile>;
}

#[derive(Debug, Clone)]
pub struct DirScanner {
    dir: PathBuf,
    extension: Option<String>,
    reserved: Option<String>,
}

impl DirScanner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: None,
            reserved: None,
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn excluding(mut self, reserved: impl Into<String>) -> Self {
        self.reserved = Some(reserved.into());
        self
    }

    fn accepts(&self, path: &Path, name: &str) -> bool {
        if self.reserved.as_deref() == Some(name) {
            return false;
        }
        match &self.extension {
            Some(ext) => path.extension().and_then(|e| e.to_str()) == Some(ext.as_str()),
            None => true,
        }
    }
}

impl FileScanner for DirScanner {
    fn scan(&self) -> Vec<ObservedFile> {
        let Ok(read_dir) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for entry in read_dir.flatten() {
            let path = entry.path();
            let Ok(meta) = fs::metadata(&path) else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                tracing::debug!(path = %path.display(), "skipping non-UTF-8 file name");
                continue;
            };
            if self.accepts(&path, name) {
                out.push(ObservedFile {
                    name: name.to_string(),
                    size: meta.len(),
                });
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::{DirScanner, FileScanner};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn scan_filters_extension_and_reserved_name() {
        let tmp = tempdir().expect("tempdir");
        fs::write(tmp.path().join("script2.js"), "// two").expect("write");
        fs::write(tmp.path().join("script1.js"), "// one").expect("write");
        fs::write(tmp.path().join("not_a_script.txt"), "x").expect("write");
        fs::write(tmp.path().join("custom_scripts.json"), "[]").expect("write");
        fs::create_dir(tmp.path().join("folder.js")).expect("mkdir");

        let files = DirScanner::new(tmp.path())
            .with_extension("js")
            .excluding("custom_scripts.json")
            .scan();
        let names = files.iter().map(|f| f.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["script1.js", "script2.js"]);
        assert_eq!(files[0].size, 6);
    }

    #[test]
    fn missing_directory_scans_empty() {
        let tmp = tempdir().expect("tempdir");
        let files = DirScanner::new(tmp.path().join("nope")).scan();
        assert!(files.is_empty());
    }
}
