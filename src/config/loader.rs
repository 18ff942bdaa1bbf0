//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for settings loading.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, SettingsError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, SettingsError> {
    let config: GatewayConfig = toml::from_str(content)?;
    validate_config(&config).map_err(SettingsError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_minimal() {
        let config = parse_config(
            r#"
            [mappings]
            path = "/etc/gateway/mappings"
            plugin_path = "/etc/gateway/plugins.toml"
            eager_resolution = true
            "#,
        )
        .unwrap();
        assert_eq!(config.mappings.path, PathBuf::from("/etc/gateway/mappings"));
        assert!(config.mappings.eager_resolution);
        assert!(config.mappings.watch);
        assert_eq!(config.observability.log_level, "info");

        let settings = config.mappings.store_settings();
        assert_eq!(settings.plugin_path, Some(PathBuf::from("/etc/gateway/plugins.toml")));
        assert!(!settings.strict_duplicates);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.mappings.path, PathBuf::from("mappings"));
    }

    #[test]
    fn test_validation_failure() {
        let err = parse_config("[observability]\nlog_level = \"chatty\"\n").unwrap_err();
        assert!(matches!(err, SettingsError::Validation(ref e) if e.len() == 1));
        assert!(err.to_string().contains("observability.log_level"));
    }

    #[test]
    fn test_syntax_error() {
        assert!(matches!(parse_config("[mappings"), Err(SettingsError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("gateway.toml")).unwrap_err();
        assert!(matches!(err, SettingsError::Io(_)));
    }
}
