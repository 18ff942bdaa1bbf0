//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and non-empty paths
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::GatewayConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mappings = &config.mappings;

    if mappings.path.as_os_str().is_empty() {
        errors.push(ValidationError {
            field: "mappings.path",
            message: "must not be empty".into(),
        });
    }
    if let Some(plugin) = &mappings.plugin_path {
        if plugin.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "mappings.plugin_path",
                message: "must not be empty when set".into(),
            });
        }
    }
    if mappings.watch && mappings.watch_poll_secs == 0 {
        errors.push(ValidationError {
            field: "mappings.watch_poll_secs",
            message: "must be greater than zero".into(),
        });
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError {
            field: "observability.log_level",
            message: format!("unknown level `{}`", config.observability.log_level),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
