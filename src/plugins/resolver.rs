//! Implementation resolution for one reload generation.
//!
//! # Responsibilities
//! - Look identifiers up in the plugin archive first, then the built-ins
//! - Check the declared kind against the registered one
//! - Initialise each handle once per generation and tear it down with the generation
//!
//! # Design Decisions
//! - One resolver per generation; dropping the last snapshot releases the archive
//!   and runs `teardown` on every handle it initialised
//! - Failures are not cached, so a later registration can still satisfy a lazy lookup

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::ResolveError;
use crate::plugins::archive::PluginArchive;
use crate::plugins::registry::{BuiltinRegistry, Implementation, ImplementationKind};

#[derive(Debug)]
pub struct ImplementationResolver {
    archive: Option<PluginArchive>,
    builtins: Arc<BuiltinRegistry>,
    cache: DashMap<String, Arc<dyn Implementation>>,
}

impl ImplementationResolver {
    pub fn new(archive: Option<PluginArchive>, builtins: Arc<BuiltinRegistry>) -> Self {
        Self {
            archive,
            builtins,
            cache: DashMap::new(),
        }
    }

    /// Resolve an identifier declared as `expected` to its implementation handle.
    pub fn resolve(
        &self,
        id: &str,
        expected: ImplementationKind,
    ) -> Result<Arc<dyn Implementation>, ResolveError> {
        if let Some(hit) = self.cache.get(id) {
            return check_kind(id, expected, Arc::clone(hit.value()));
        }

        match self.cache.entry(id.to_string()) {
            Entry::Occupied(entry) => check_kind(id, expected, Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let found = self
                    .archive
                    .as_ref()
                    .and_then(|archive| archive.lookup(id))
                    .or_else(|| self.builtins.get(id))
                    .ok_or_else(|| ResolveError::NotFound { id: id.to_string() })?;
                let found = check_kind(id, expected, found)?;

                // The shard stays locked, so two readers never both initialise the same id.
                found.init()?;
                tracing::trace!(id, kind = %expected, origin = ?found.origin(), "Implementation initialised");
                entry.insert(Arc::clone(&found));
                Ok(found)
            }
        }
    }

    pub fn archive(&self) -> Option<&PluginArchive> {
        self.archive.as_ref()
    }

    /// Number of identifiers resolved so far in this generation.
    pub fn resolved_count(&self) -> usize {
        self.cache.len()
    }
}

impl Drop for ImplementationResolver {
    fn drop(&mut self) {
        for entry in self.cache.iter() {
            entry.value().teardown();
        }
        if !self.cache.is_empty() {
            tracing::debug!(released = self.cache.len(), "Implementation handles torn down");
        }
    }
}

fn check_kind(
    id: &str,
    expected: ImplementationKind,
    found: Arc<dyn Implementation>,
) -> Result<Arc<dyn Implementation>, ResolveError> {
    if found.kind() == expected {
        Ok(found)
    } else {
        Err(ResolveError::KindMismatch {
            id: id.to_string(),
            expected,
            found: found.kind(),
        })
    }
}
