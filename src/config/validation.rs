//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::{Config, StoreBackend};
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("websocket.path must start with '/', got '{0}'")]
    InvalidWebSocketPath(String),
    #[error("websocket.ping_interval must be greater than 0")]
    ZeroPingInterval,
    #[error("websocket.ping_timeout ({timeout}s) must exceed ping_interval ({interval}s)")]
    PingTimeoutTooShort { interval: u64, timeout: u64 },
    #[error("store.retention must be greater than 0")]
    ZeroRetention,
    #[error("store.sweep_interval must be greater than 0")]
    ZeroSweepInterval,
    #[error("store.timeout_ms must be greater than 0")]
    ZeroStoreTimeout,
    #[error("store.path parent directory does not exist: {0}")]
    StorePathInvalid(String),
    #[error("limits.max_code_attempts must be greater than 0")]
    ZeroCodeAttempts,
    #[error("limits.outbound_queue must be greater than 0")]
    ZeroOutboundQueue,
    #[error("limits.message_rate and limits.message_burst must be positive")]
    InvalidRate,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.trim().is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    let ws = &config.websocket;
    if !ws.path.starts_with('/') {
        errors.push(ValidationError::InvalidWebSocketPath(ws.path.clone()));
    }
    if ws.ping_interval == 0 {
        errors.push(ValidationError::ZeroPingInterval);
    } else if ws.ping_timeout <= ws.ping_interval {
        errors.push(ValidationError::PingTimeoutTooShort {
            interval: ws.ping_interval,
            timeout: ws.ping_timeout,
        });
    }

    let store = &config.store;
    if store.retention == 0 {
        errors.push(ValidationError::ZeroRetention);
    }
    if store.sweep_interval == 0 {
        errors.push(ValidationError::ZeroSweepInterval);
    }
    if store.timeout_ms == 0 {
        errors.push(ValidationError::ZeroStoreTimeout);
    }
    if store.backend == StoreBackend::Sqlite && store.path != ":memory:" {
        let db_path = Path::new(&store.path);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::StorePathInvalid(store.path.clone()));
        }
    }

    let limits = &config.limits;
    if limits.max_code_attempts == 0 {
        errors.push(ValidationError::ZeroCodeAttempts);
    }
    if limits.outbound_queue == 0 {
        errors.push(ValidationError::ZeroOutboundQueue);
    }
    if limits.message_rate <= 0.0 || limits.message_burst < 1.0 {
        errors.push(ValidationError::InvalidRate);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
