//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::limits::LimitsConfig;
use super::listen::{ListenConfig, WebSocketConfig};
use super::store::StoreConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {var}: {value}")]
    Env { var: &'static str, value: String },
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server information.
    #[serde(default)]
    pub server: ServerConfig,
    /// HTTP listener configuration.
    pub listen: ListenConfig,
    /// WebSocket endpoint configuration.
    #[serde(default)]
    pub websocket: WebSocketConfig,
    /// Session store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Per-connection and allocation limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// HTTP API toggles.
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `PORT` and `STORMER_ENV` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(
            std::env::var("PORT").ok().as_deref(),
            std::env::var("STORMER_ENV").ok().as_deref(),
        )
    }

    fn apply_overrides(
        &mut self,
        port: Option<&str>,
        environment: Option<&str>,
    ) -> Result<(), ConfigError> {
        if let Some(port) = port {
            let port: u16 = port.trim().parse().map_err(|_| ConfigError::Env {
                var: "PORT",
                value: port.to_string(),
            })?;
            self.listen.address.set_port(port);
        }
        if let Some(environment) = environment
            && !environment.is_empty()
        {
            self.server.environment = environment.to_string();
        }
        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name reported in logs.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Deployment environment reported by `/api/health`.
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            environment: default_environment(),
            log_format: LogFormat::default(),
        }
    }
}

fn default_server_name() -> String {
    "stormer".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

/// HTTP API toggles.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Serve Prometheus metrics at `/metrics`.
    #[serde(default = "default_true")]
    pub metrics: bool,
    /// Serve `/api/debug/sessions`.
    #[serde(default = "default_true")]
    pub debug_endpoints: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            metrics: true,
            debug_endpoints: true,
        }
    }
}

fn default_true() -> bool {
    true
}
