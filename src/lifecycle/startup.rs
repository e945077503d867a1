//! Startup orchestration.
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Config is validated before any subsystem is built
//! - Listeners bind last (traffic only when ready)

use std::path::Path;
use thiserror::Error;
use tokio::net::TcpListener;
use crate::config::{load_config, ConfigError, GatewayConfig};
use crate::load_balancer::UnknownAlgorithm;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Algorithm(#[from] UnknownAlgorithm),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },
}

/// Load the config file if one was given, otherwise fall back to defaults.
pub fn resolve_config(path: Option<&Path>) -> Result<GatewayConfig, StartupError> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => {
            tracing::info!("No config file given, using defaults");
            Ok(GatewayConfig::default())
        }
    }
}

pub async fn bind_listener(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_config_defaults() {
        let config = resolve_config(None).unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_resolve_config_missing_file() {
        let err = resolve_config(Some(Path::new("/nonexistent/gateway.toml"))).unwrap_err();
        assert!(matches!(err, StartupError::Config(ConfigError::Io(_))));
    }

    #[tokio::test]
    async fn test_bind_listener_reports_address() {
        let err = bind_listener("not-an-address").await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to bind not-an-address"));
    }
}
