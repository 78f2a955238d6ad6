//! Session store configuration.

use serde::Deserialize;
use std::time::Duration;

/// Which `SessionStore` implementation backs the board.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local map; sessions vanish on restart.
    #[default]
    Memory,
    /// SQLite file via sqlx.
    Sqlite,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Memory => "memory",
            StoreBackend::Sqlite => "sqlite",
        }
    }
}

/// Session store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: StoreBackend,
    /// Database path for the sqlite backend (":memory:" allowed).
    #[serde(default = "default_path")]
    pub path: String,
    /// Seconds a session lives after creation, regardless of activity.
    #[serde(default = "default_retention")]
    pub retention: u64,
    /// Seconds between expiry sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,
    /// Per-call timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl StoreConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_path(),
            retention: default_retention(),
            sweep_interval: default_sweep_interval(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_path() -> String {
    "stormer.db".to_string()
}

fn default_retention() -> u64 {
    86400 // 24 hours
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_timeout_ms() -> u64 {
    5000
}
