//! Pluggable implementation archive.
//!
//! A deploy-time unit listing extra implementation identifiers, described by
//! a TOML manifest:
//!
//! ```toml
//! name = "custom-actions"
//!
//! [[implementation]]
//! id = "com.example.LogAction"
//! kind = "action"
//! ```
//!
//! Each reload opens the archive again from its configured path; nothing is
//! cached across generations.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::plugins::registry::{
    DeclaredImplementation, Implementation, ImplementationKind, Origin,
};

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "implementation")]
    implementations: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    id: String,
    kind: ImplementationKind,
}

/// An opened archive, owned by one reload generation.
#[derive(Debug)]
pub struct PluginArchive {
    path: PathBuf,
    name: String,
    entries: HashMap<String, Arc<dyn Implementation>>,
}

impl PluginArchive {
    /// Read and index the archive manifest.
    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        let failed = |detail: String| ConfigError::PluginArchive {
            path: path.to_path_buf(),
            detail,
        };
        let content = fs::read_to_string(path).map_err(|e| failed(e.to_string()))?;
        let manifest: Manifest = toml::from_str(&content).map_err(|e| failed(e.to_string()))?;

        let mut entries: HashMap<String, Arc<dyn Implementation>> = HashMap::new();
        for entry in manifest.implementations {
            if entry.id.trim().is_empty() {
                return Err(failed("implementation with empty id".to_string()));
            }
            let implementation =
                DeclaredImplementation::new(&entry.id, entry.kind, Origin::Archive(path.to_path_buf()));
            entries.insert(entry.id, Arc::new(implementation));
        }

        let name = manifest
            .name
            .unwrap_or_else(|| path.display().to_string());
        tracing::debug!(archive = %name, implementations = entries.len(), "Plugin archive opened");

        Ok(Self {
            path: path.to_path_buf(),
            name,
            entries,
        })
    }

    pub fn lookup(&self, id: &str) -> Option<Arc<dyn Implementation>> {
        self.entries.get(id).cloned()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugins.toml");
        fs::write(
            &path,
            r#"
                name = "custom"

                [[implementation]]
                id = "com.example.LogAction"
                kind = "action"

                [[implementation]]
                id = "com.example.HideSecrets"
                kind = "filter"
            "#,
        )
        .unwrap();

        let archive = PluginArchive::open(&path).unwrap();
        assert_eq!(archive.name(), "custom");
        assert_eq!(archive.len(), 2);

        let filter = archive.lookup("com.example.HideSecrets").unwrap();
        assert_eq!(filter.kind(), ImplementationKind::Filter);
        assert_eq!(filter.origin(), Origin::Archive(path.clone()));
        assert!(archive.lookup("com.example.Other").is_none());
    }

    #[test]
    fn test_unreadable_archive() {
        let dir = tempfile::tempdir().unwrap();
        let err = PluginArchive::open(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::PluginArchive { .. }));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugins.toml");
        fs::write(&path, "[[implementation]]\nid = \"x\"\nkind = \"codec\"\n").unwrap();
        assert!(PluginArchive::open(&path).is_err());
    }
}
