//! Network module.
//!
//! Contains the Gateway (HTTP/WebSocket listener), the per-connection loop,
//! and rate limiting.

mod connection;
mod gateway;
pub mod limit;

pub use connection::Connection;
pub use gateway::{Gateway, ws_handler};
