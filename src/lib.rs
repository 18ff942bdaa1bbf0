//! Routing-table core of an API gateway.
//!
//! Turns a directory of XML mapping descriptors into versioned routing tables
//! and resolves (version, method, path) to a backend, its ordered actions, an
//! optional response filter and custom error messages. Reloads rebuild every
//! table and publish them atomically.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod mapping;
pub mod observability;
pub mod plugins;
pub mod routing;

pub use config::GatewayConfig;
pub use error::{ConfigError, ReloadError, ResolveError, RouteMiss};
pub use mapping::{DirectorySource, EndpointSpec, MappingDescriptor};
pub use plugins::{BuiltinRegistry, ImplementationKind};
pub use routing::{MappingStore, ResolvedRoute, StoreSettings};
