//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (grace period > 0, latency window non-empty)
//! - Validate addresses and URLs before anything is bound
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),
    #[error("listener.max_connections must be greater than zero")]
    MaxConnections,
    #[error("shutdown.grace_period_ms must be greater than zero")]
    GracePeriod,
    #[error("echo.version_var must not be empty")]
    VersionVar,
    #[error("echo.latency window [{min_ms}ms, {max_ms}ms) is empty")]
    LatencyWindow { min_ms: u64, max_ms: u64 },
    #[error("relay.downstream_url `{0}` is not an absolute http(s) URL")]
    DownstreamUrl(String),
}

pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::MaxConnections);
    }
    if config.shutdown.grace_period_ms == 0 {
        errors.push(ValidationError::GracePeriod);
    }
    if config.echo.version_var.is_empty() {
        errors.push(ValidationError::VersionVar);
    }

    let latency = &config.echo.latency;
    if latency.enabled && latency.min_ms >= latency.max_ms {
        errors.push(ValidationError::LatencyWindow {
            min_ms: latency.min_ms,
            max_ms: latency.max_ms,
        });
    }

    if config.relay.enabled {
        let url_ok = reqwest::Url::parse(&config.relay.downstream_url)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
            .unwrap_or(false);
        if !url_ok {
            errors.push(ValidationError::DownstreamUrl(config.relay.downstream_url.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
