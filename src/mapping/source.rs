//! Where descriptor units come from.
//!
//! The store only sees `DescriptorSource`; the directory implementation is
//! what the gateway binary wires in.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// One raw descriptor, as handed to the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Identity used in error messages (usually the file name).
    pub id: String,
    pub content: String,
}

impl SourceUnit {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

/// Yields the full set of descriptor units on every call.
pub trait DescriptorSource: Send + Sync {
    /// Read every unit. Called once per reload.
    fn units(&self) -> Result<Vec<SourceUnit>, ConfigError>;

    /// Human readable location, for logging.
    fn describe(&self) -> String;
}

/// Reads every `*.xml` regular file of a directory, in file-name order.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    path: PathBuf,
}

impl DirectorySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DescriptorSource for DirectorySource {
    fn units(&self) -> Result<Vec<SourceUnit>, ConfigError> {
        if !self.path.is_dir() {
            return Err(ConfigError::NotADirectory(self.path.clone()));
        }
        let unreadable = |source| ConfigError::DirectoryUnreadable {
            path: self.path.clone(),
            source,
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.path).map_err(unreadable)? {
            let path = entry.map_err(unreadable)?.path();
            let is_xml = path.extension().is_some_and(|ext| ext == "xml");
            if path.is_file() && is_xml {
                files.push(path);
            }
        }
        files.sort();

        files
            .into_iter()
            .map(|path| {
                let id = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                fs::read_to_string(&path)
                    .map(|content| SourceUnit { id: id.clone(), content })
                    .map_err(|source| ConfigError::UnitUnreadable { unit: id, source })
            })
            .collect()
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_only_xml_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.xml"), "<b/>").unwrap();
        fs::write(dir.path().join("a.xml"), "<a/>").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested.xml")).unwrap();

        let units = DirectorySource::new(dir.path()).units().unwrap();
        let ids: Vec<_> = units.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["a.xml", "b.xml"]);
        assert_eq!(units[0].content, "<a/>");
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = DirectorySource::new(&missing).units().unwrap_err();
        assert!(matches!(err, ConfigError::NotADirectory(p) if p == missing));
    }
}
