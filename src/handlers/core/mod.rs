//! Core handler infrastructure.
//!
//! The handler trait, the per-event context, and the registry that routes
//! decoded frames to handlers.

pub mod context;
pub mod registry;

pub use context::{Context, Handler};
pub use registry::Registry;
