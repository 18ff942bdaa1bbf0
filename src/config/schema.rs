//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the gateway's
//! TOML settings file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::routing::StoreSettings;

/// Root configuration for the mapping gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Mapping descriptors and how they are loaded.
    pub mappings: MappingsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Where descriptors come from and how reloads behave.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MappingsConfig {
    /// Directory holding `*.xml` mapping descriptors.
    pub path: PathBuf,

    /// Optional pluggable implementation archive (TOML manifest).
    pub plugin_path: Option<PathBuf>,

    /// Fail a reload when any action/filter identifier is unresolvable.
    pub eager_resolution: bool,

    /// Reject repeated action/filter/error names within one descriptor.
    pub strict_duplicates: bool,

    /// Reload automatically when the directory changes.
    pub watch: bool,

    /// Poll interval for the directory watcher in seconds.
    pub watch_poll_secs: u64,
}

impl Default for MappingsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("mappings"),
            plugin_path: None,
            eager_resolution: false,
            strict_duplicates: false,
            watch: true,
            watch_poll_secs: 2,
        }
    }
}

impl MappingsConfig {
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            plugin_path: self.plugin_path.clone(),
            eager_resolution: self.eager_resolution,
            strict_duplicates: self.strict_duplicates,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
