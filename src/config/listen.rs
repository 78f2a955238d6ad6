//! Network listener configuration.

use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind to (e.g., "0.0.0.0:3001").
    pub address: SocketAddr,
    /// Directory served at `/` (the browser client).
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

fn default_static_dir() -> String {
    "public".to_string()
}

/// WebSocket endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Upgrade path.
    #[serde(default = "default_ws_path")]
    pub path: String,
    /// Allowed origins for CORS (empty = allow all).
    #[serde(default)]
    pub allow_origins: Vec<String>,
    /// Reject upgrades without an Origin header.
    #[serde(default)]
    pub require_origin: bool,
    /// Seconds between keepalive pings.
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    /// Seconds of silence before a connection is dropped.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

impl WebSocketConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout)
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            path: default_ws_path(),
            allow_origins: Vec::new(),
            require_origin: false,
            ping_interval: default_ping_interval(),
            ping_timeout: default_ping_timeout(),
        }
    }
}

fn default_ws_path() -> String {
    "/ws".to_string()
}

fn default_ping_interval() -> u64 {
    25
}

fn default_ping_timeout() -> u64 {
    60
}
