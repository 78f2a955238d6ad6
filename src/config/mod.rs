//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, HttpConfig)
//! - [`listen`]: Listener and WebSocket configuration
//! - [`store`]: Session store backend and expiry configuration
//! - [`limits`]: Per-connection and allocation limits
//! - [`validation`]: Startup checks

mod limits;
mod listen;
mod store;
mod types;
pub mod validation;

pub use limits::LimitsConfig;
pub use listen::WebSocketConfig;
pub use store::StoreBackend;
pub use types::{Config, LogFormat};
