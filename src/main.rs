//! stormerd - real-time collaborative brainstorming board server.
//!
//! Clients create short-lived sessions identified by six-character codes,
//! join them by code, and share ideas, to-do items, and SWOT entries over a
//! WebSocket. Sessions end when the last participant leaves, when the host
//! ends them, or when the retention window runs out.

mod config;
mod error;
mod handlers;
mod http;
mod metrics;
mod network;
mod state;
mod store;
mod telemetry;

use crate::config::{Config, LogFormat, StoreBackend};
use crate::handlers::Registry;
use crate::network::Gateway;
use crate::state::{Board, spawn_expiry_task};
use crate::store::{MemoryStore, SessionStore, SqliteStore, TimedStore};
use anyhow::Context as _;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first: it picks the log format.
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let mut config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;

    init_tracing(config.server.log_format);

    config.apply_env_overrides()?;
    if let Err(errors) = config::validation::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {}", errors.len(), config_path);
    }

    info!(
        server = %config.server.name,
        environment = %config.server.environment,
        backend = config.store.backend.as_str(),
        "Starting stormerd"
    );

    let store = open_store(&config).await?;
    let board = Arc::new(Board::new(store, &config));
    let registry = Arc::new(Registry::new());
    info!(events = ?registry.events().collect::<Vec<_>>(), "Event handlers registered");

    if config.http.metrics {
        metrics::init();
        info!("Metrics enabled at /metrics");
    }

    spawn_expiry_task(Arc::clone(&board), config.store.sweep_interval());
    info!(
        retention_secs = config.store.retention,
        sweep_secs = config.store.sweep_interval,
        "Expiry sweeper started"
    );

    let gateway = Gateway::bind(&config, board, registry).await?;
    gateway.run().await
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Open the configured backend and wrap it in the per-call timeout.
async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn SessionStore>> {
    let retention = config.store.retention();
    let inner: Arc<dyn SessionStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new(retention)),
        StoreBackend::Sqlite => {
            let store = SqliteStore::open(&config.store.path, retention)
                .await
                .with_context(|| format!("failed to open sqlite store at {}", config.store.path))?;
            info!(path = %config.store.path, "SQLite store ready");
            Arc::new(store)
        }
    };
    Ok(Arc::new(TimedStore::new(inner, config.store.timeout())))
}
