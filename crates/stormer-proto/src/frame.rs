//! Event envelope codec.
//!
//! A frame is one WebSocket text message holding `{"event": name, "data": payload}`.
//! [`Frame::decode`] only checks the envelope, leaving the payload as raw JSON so
//! a dispatcher can route on the name before committing to a payload type.

use crate::error::{ProtocolError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A decoded envelope whose payload has not been interpreted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Event name, e.g. `join-session`.
    pub event: String,
    /// Raw payload. `null` when the sender omitted it.
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    /// Parse an envelope from a text frame.
    pub fn decode(text: &str) -> Result<Self> {
        let frame: Frame = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;
        if frame.event.is_empty() {
            return Err(ProtocolError::EmptyEvent);
        }
        Ok(frame)
    }

    /// Interpret the payload as `T`.
    pub fn payload<T: DeserializeOwned>(self) -> Result<T> {
        let Frame { event, data } = self;
        serde_json::from_value(data).map_err(|source| ProtocolError::InvalidPayload { event, source })
    }
}

/// Serialize an event (client or server side) to frame text.
pub fn encode<T: Serialize>(event: &T) -> Result<String> {
    serde_json::to_string(event).map_err(ProtocolError::Encode)
}

/// Deserialize a full typed event from frame text.
///
/// Clients use this with [`ServerEvent`](crate::ServerEvent); the server side
/// prefers [`Frame::decode`] so unknown events can be skipped cheaply.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(ProtocolError::Malformed)
}
