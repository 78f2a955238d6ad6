//! State management module.
//!
//! Contains the Board (shared server state) and the pieces it is built from.

mod board;
mod code;
mod conn;
pub mod expiry;
mod hub;
mod membership;

pub use board::Board;
pub use conn::ConnId;
pub use expiry::spawn_expiry_task;
pub use membership::{Binding, Departure, Joined};
