//! Error types for the wire protocol.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Errors raised while encoding or decoding frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Text was not a JSON envelope.
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Envelope carried an empty event name.
    #[error("frame has an empty event name")]
    EmptyEvent,

    /// Payload did not match the shape the event requires.
    #[error("invalid payload for {event}: {source}")]
    InvalidPayload {
        /// Event whose payload was rejected.
        event: String,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Event could not be serialized.
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ProtocolError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolError::Malformed(_) => "malformed",
            ProtocolError::EmptyEvent => "empty_event",
            ProtocolError::InvalidPayload { .. } => "invalid_payload",
            ProtocolError::Encode(_) => "encode",
        }
    }
}
