//! # stormer-proto
//!
//! Wire protocol for the Stormer collaborative brainstorming board.
//!
//! ## Features
//!
//! - JSON event envelopes (`{"event": ..., "data": ...}`) over WebSocket text frames
//! - Typed client and server events with their payloads
//! - The idea data model with per-template validation
//! - Session code alphabet helpers
//! - WebSocket origin policy checks for gateways

#![deny(clippy::all)]
#![warn(missing_docs)]

//! ## Quick Start
//!
//! ```rust
//! use stormer_proto::{ClientEvent, CreateSession, Frame, Template};
//!
//! let event = ClientEvent::CreateSession(CreateSession {
//!     username: "alice".into(),
//!     topic: "Q3 planning".into(),
//!     template: Template::Todo,
//! });
//! let text = stormer_proto::encode(&event).unwrap();
//!
//! let frame = Frame::decode(&text).unwrap();
//! assert_eq!(frame.event, "create-session");
//! let payload: CreateSession = frame.payload().unwrap();
//! assert_eq!(payload.username, "alice");
//! ```

pub mod code;
pub mod error;
pub mod event;
pub mod frame;
pub mod idea;
pub mod origin;
pub mod session;

pub use self::code::{is_valid_code, normalize_code, CODE_ALPHABET, CODE_LEN};
pub use self::error::{ProtocolError, Result};
pub use self::event::{
    ClientEvent, CreateSession, EndSession, JoinSession, LeaveSession, NewIdea,
    RequestSessionData, Roster, ServerEvent, SessionCreated, SessionData, SessionEnded,
    SessionJoined, SharedIdea, ToggleTodo,
};
pub use self::frame::{decode, encode, Frame};
pub use self::idea::{Idea, IdeaError, IdeaKind, Priority, SwotCategory};
pub use self::origin::{OriginPolicy, OriginRejection};
pub use self::session::Template;
