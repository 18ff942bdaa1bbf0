//! Error taxonomy for loading and resolving mappings.
//!
//! # Design Decisions
//! - Load-time failures (`ConfigError`, `ResolveError`) abort a reload, never the gateway
//! - Routing misses (`RouteMiss`) are ordinary outcomes, not errors
//! - Every descriptor failure carries the unit it came from

use std::path::PathBuf;

use axum::http::Method;
use thiserror::Error;

use crate::plugins::ImplementationKind;
use crate::routing::pattern::PatternError;

/// A descriptor or directory could not be turned into a version table.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read mapping directory {path}: {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("mapping path {0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("cannot read {unit}: {source}")]
    UnitUnreadable {
        unit: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{unit}: malformed descriptor: {detail}")]
    Malformed { unit: String, detail: String },

    #[error("{unit}: missing required {what}")]
    Missing { unit: String, what: String },

    #[error("{unit}: invalid backend: {detail}")]
    InvalidBackend { unit: String, detail: String },

    #[error("{unit}: invalid error status `{status}`")]
    InvalidStatus { unit: String, status: String },

    #[error("{unit}: endpoint #{index}: {source}")]
    InvalidPattern {
        unit: String,
        index: usize,
        #[source]
        source: PatternError,
    },

    #[error("{unit}: endpoint #{index}: unknown {kind} `{name}`")]
    UnknownReference {
        unit: String,
        index: usize,
        kind: &'static str,
        name: String,
    },

    #[error("{unit}: endpoint #{index}: invalid method `{method}`")]
    InvalidMethod {
        unit: String,
        index: usize,
        method: String,
    },

    #[error("{unit}: duplicate {kind} `{name}`")]
    Duplicate {
        unit: String,
        kind: &'static str,
        name: String,
    },

    #[error("plugin archive {path}: {detail}")]
    PluginArchive { path: PathBuf, detail: String },

    #[error("{} descriptor(s) failed: {}", .0.len(), join(.0))]
    Batch(Vec<ConfigError>),
}

fn join(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// An implementation identifier could not be located.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no implementation registered for `{id}`")]
    NotFound { id: String },

    #[error("`{name}` is not declared for this endpoint")]
    UnboundName { name: String },

    #[error("`{id}` is registered as {found}, but is declared as {expected}")]
    KindMismatch {
        id: String,
        expected: ImplementationKind,
        found: ImplementationKind,
    },

    #[error("`{id}` failed to initialise: {reason}")]
    InitFailed { id: String, reason: String },
}

/// Why a reload attempt left the store unchanged.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("class resolution error: {0}")]
    ClassResolution(#[from] ResolveError),

    #[error("another reload is already in progress")]
    InProgress,
}

/// Expected outcome of a lookup that did not produce a route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteMiss {
    #[error("unknown API version `{0}`")]
    UnknownVersion(String),

    #[error("no mapping for {method} {path} in version `{version}`")]
    NotFound {
        version: String,
        method: Method,
        path: String,
    },
}
