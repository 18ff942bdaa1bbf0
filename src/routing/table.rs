//! Per-version routing table.
//!
//! # Responsibilities
//! - Compile every endpoint of one descriptor
//! - Store compiled patterns in declaration order, one slot per pattern
//! - Look up the first entry whose method and full path match
//!
//! # Design Decisions
//! - Immutable after construction (shared via Arc across readers)
//! - A pattern declared twice keeps its first position and its last endpoint
//! - O(n) scan; tables are small and order is deterministic

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;

use crate::error::ConfigError;
use crate::mapping::{EndpointSpec, MappingDescriptor};
use crate::routing::pattern::{compile, CompiledPattern};

/// A compiled route inside a table.
#[derive(Debug)]
pub struct TableEntry {
    pub pattern: CompiledPattern,
    pub endpoint: Arc<EndpointSpec>,
}

/// Successful table lookup.
#[derive(Debug)]
pub struct TableMatch<'a> {
    pub entry: &'a TableEntry,
    /// Value captured by the placeholder, if any.
    pub captured: Option<String>,
}

/// Compiled routing index for a single API version.
#[derive(Debug)]
pub struct VersionTable {
    version: String,
    unit: String,
    entries: Vec<TableEntry>,
    actions: HashMap<String, String>,
    filters: HashMap<String, String>,
    errors: HashMap<u16, String>,
}

impl VersionTable {
    /// Compile a parsed descriptor into a table.
    pub fn build(descriptor: MappingDescriptor) -> Result<Self, ConfigError> {
        let MappingDescriptor {
            unit,
            version,
            endpoints,
            actions,
            filters,
            errors,
            ..
        } = descriptor;

        let mut entries: Vec<TableEntry> = Vec::with_capacity(endpoints.len());
        let mut slots: HashMap<CompiledPattern, usize> = HashMap::with_capacity(endpoints.len());

        for (index, endpoint) in endpoints.into_iter().enumerate() {
            let pattern = compile(&endpoint).map_err(|source| ConfigError::InvalidPattern {
                unit: unit.clone(),
                index,
                source,
            })?;
            let endpoint = Arc::new(endpoint);
            match slots.get(&pattern) {
                Some(&slot) => {
                    tracing::debug!(
                        unit = %unit,
                        index,
                        pattern = %pattern.source(),
                        "Pattern declared twice, replacing earlier endpoint"
                    );
                    entries[slot].endpoint = endpoint;
                }
                None => {
                    slots.insert(pattern.clone(), entries.len());
                    entries.push(TableEntry { pattern, endpoint });
                }
            }
        }

        Ok(Self {
            version,
            unit,
            entries,
            actions,
            filters,
            errors,
        })
    }

    /// First entry matching method and full path.
    pub fn lookup(&self, method: &Method, path: &str) -> Option<TableMatch<'_>> {
        self.entries.iter().find_map(|entry| {
            entry
                .pattern
                .match_path(method, path)
                .map(|captured| TableMatch { entry, captured })
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Source unit this table was built from.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Implementation identifier of a declared action.
    pub fn action_id(&self, name: &str) -> Option<&str> {
        self.actions.get(name).map(String::as_str)
    }

    /// Implementation identifier of a declared filter.
    pub fn filter_id(&self, name: &str) -> Option<&str> {
        self.filters.get(name).map(String::as_str)
    }

    /// Custom message for a status code, if this version declares one.
    pub fn error_message(&self, status: u16) -> Option<&str> {
        self.errors.get(&status).map(String::as_str)
    }
}
