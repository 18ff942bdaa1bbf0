//! Built-in implementation registry.
//!
//! Actions and response filters are capabilities registered under string
//! identifiers. The gateway owns one registry; every reload generation
//! resolves against it through its own `ImplementationResolver`.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

/// What a registered implementation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImplementationKind {
    Action,
    Filter,
}

impl fmt::Display for ImplementationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImplementationKind::Action => f.write_str("action"),
            ImplementationKind::Filter => f.write_str("filter"),
        }
    }
}

/// Where an implementation was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    BuiltIn,
    Archive(PathBuf),
}

/// A named action or response filter implementation.
pub trait Implementation: Send + Sync + fmt::Debug {
    /// Identifier descriptors refer to (the `className` attribute).
    fn id(&self) -> &str;

    fn kind(&self) -> ImplementationKind;

    fn origin(&self) -> Origin {
        Origin::BuiltIn
    }

    /// Called once per reload generation, the first time the generation resolves this id.
    fn init(&self) -> Result<(), ResolveError> {
        Ok(())
    }

    /// Called when the generation that initialised this handle is released.
    fn teardown(&self) {}
}

/// Implementation known only by identifier and kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredImplementation {
    id: String,
    kind: ImplementationKind,
    origin: Origin,
}

impl DeclaredImplementation {
    pub fn new(id: impl Into<String>, kind: ImplementationKind, origin: Origin) -> Self {
        Self {
            id: id.into(),
            kind,
            origin,
        }
    }
}

impl Implementation for DeclaredImplementation {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ImplementationKind {
        self.kind
    }

    fn origin(&self) -> Origin {
        self.origin.clone()
    }
}

/// Process-wide set of implementations compiled into the gateway.
#[derive(Debug, Default)]
pub struct BuiltinRegistry {
    entries: DashMap<String, Arc<dyn Implementation>>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an implementation; replaces any previous one with the same id.
    ///
    /// Takes effect for generations built after the call.
    pub fn register(&self, implementation: Arc<dyn Implementation>) {
        let id = implementation.id().to_string();
        if self.entries.insert(id.clone(), implementation).is_some() {
            tracing::debug!(id = %id, "Replaced built-in implementation");
        }
    }

    /// Register an identifier with no behaviour of its own.
    pub fn register_declared(&self, id: impl Into<String>, kind: ImplementationKind) {
        self.register(Arc::new(DeclaredImplementation::new(id, kind, Origin::BuiltIn)));
    }

    /// Remove an implementation. Generations that already resolved it keep their handle.
    pub fn unregister(&self, id: &str) -> Option<Arc<dyn Implementation>> {
        self.entries.remove(id).map(|(_, implementation)| implementation)
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Implementation>> {
        self.entries.get(id).map(|entry| Arc::clone(entry.value()))
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
    fn test_register_and_unregister() {
        let registry = BuiltinRegistry::new();
        assert!(registry.is_empty());

        registry.register_declared("com.example.LogAction", ImplementationKind::Action);
        let found = registry.get("com.example.LogAction").unwrap();
        assert_eq!(found.kind(), ImplementationKind::Action);
        assert_eq!(found.origin(), Origin::BuiltIn);

        assert!(registry.unregister("com.example.LogAction").is_some());
        assert!(registry.get("com.example.LogAction").is_none());
    }

    #[test]
    fn test_register_replaces() {
        let registry = BuiltinRegistry::new();
        registry.register_declared("x", ImplementationKind::Action);
        registry.register_declared("x", ImplementationKind::Filter);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("x").unwrap().kind(), ImplementationKind::Filter);
    }
}
