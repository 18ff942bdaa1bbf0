//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!
//! On descriptor change:
//!     watcher.rs detects change in the mappings directory
//!     → MappingStore::reload rebuilds every version table
//!     → atomic swap of the published snapshot
//! ```
//!
//! # Design Decisions
//! - Settings are immutable once loaded; descriptors are what hot reload covers
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, SettingsError};
pub use schema::{GatewayConfig, MappingsConfig, ObservabilityConfig};
pub use watcher::MappingWatcher;
