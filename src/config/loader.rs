//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;
use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_algorithm_is_fatal() {
        let err = parse_config(
            r#"
            [gateway]
            algorithm = "weighted-random"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("weighted-random"));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("service_gateway_loader_test.toml");
        fs::write(
            &path,
            r#"
            [services]
            TOGGLE-SERVICE = ["http://127.0.0.1:9100"]

            [routes]
            toggles = "TOGGLE-SERVICE"
            "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.routes["toggles"], "TOGGLE-SERVICE");

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_sample_config_is_valid() {
        let config = parse_config(include_str!("../../gateway.toml")).unwrap();
        assert_eq!(config.gateway.algorithm, "adaptive");
        assert_eq!(config.services["FEATURE-SERVICE"].len(), 2);
        assert_eq!(config.retries.backoff, crate::config::BackoffKind::Exponential);
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
