//! Typed mapping records produced by the parser.

use std::collections::HashMap;
use std::fmt;

use axum::http::Method;

use crate::plugins::ImplementationKind;

/// Backend server an endpoint forwards to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Backend {
    pub host: String,
    pub port: u16,
}

impl Backend {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The single `{name}` placeholder of an endpoint template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathVariable {
    /// Placeholder name, without braces.
    pub name: String,
    /// Regex fragment substituted for the placeholder.
    pub expression: String,
}

impl PathVariable {
    /// The literal token as it appears in a template, e.g. `{id}`.
    pub fn token(&self) -> String {
        format!("{{{}}}", self.name)
    }
}

/// One declared route, with backend defaults already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSpec {
    pub method: Method,
    /// Externally exposed path template.
    pub external_path: String,
    /// Path on the backend; equals `external_path` unless declared.
    pub internal_path: String,
    pub variable: Option<PathVariable>,
    /// Ordered references into the descriptor's action map.
    pub action_names: Vec<String>,
    pub filter_name: Option<String>,
    pub scope: Option<String>,
    pub backend: Backend,
}

impl EndpointSpec {
    /// Backend path for a request, with the captured value substituted.
    pub fn backend_path(&self, captured: Option<&str>) -> String {
        match (&self.variable, captured) {
            (Some(var), Some(value)) => self.internal_path.replace(&var.token(), value),
            _ => self.internal_path.clone(),
        }
    }
}

/// One parsed configuration unit. Immutable once parsed.
#[derive(Debug, Clone)]
pub struct MappingDescriptor {
    /// Identity of the source unit, for error reporting.
    pub unit: String,
    pub version: String,
    pub default_backend: Option<Backend>,
    pub endpoints: Vec<EndpointSpec>,
    /// Action name to implementation identifier.
    pub actions: HashMap<String, String>,
    /// Filter name to implementation identifier.
    pub filters: HashMap<String, String>,
    /// HTTP status to custom message.
    pub errors: HashMap<u16, String>,
}

impl MappingDescriptor {
    /// Every implementation identifier referenced by this descriptor, with the kind it is declared as.
    pub fn implementation_ids(&self) -> impl Iterator<Item = (&str, ImplementationKind)> {
        let actions = self
            .actions
            .values()
            .map(|id| (id.as_str(), ImplementationKind::Action));
        let filters = self
            .filters
            .values()
            .map(|id| (id.as_str(), ImplementationKind::Filter));
        actions.chain(filters)
    }
}
