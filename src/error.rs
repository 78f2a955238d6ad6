//! Unified error handling for the board server.
//!
//! Handler errors carry everything the dispatcher needs: a metric label and
//! the text (if any) the requesting client should see. Nothing here ever
//! reaches other participants of a session.

use crate::store::StoreError;
use stormer_proto::event::{
    CREATE_SESSION, END_SESSION, JOIN_SESSION, LEAVE_SESSION, NEW_IDEA, REQUEST_SESSION_DATA,
    TOGGLE_TODO,
};
use stormer_proto::{IdeaError, ProtocolError};
use thiserror::Error;

// ============================================================================
// Handler Errors (event processing)
// ============================================================================

/// Errors that can occur while handling one inbound event.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("username already taken: {0}")]
    UsernameTaken(String),

    #[error("no free session code after {0} attempts")]
    CodeSpaceExhausted(usize),

    #[error("session store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// Non-host tried to end a session. Never reported to the client.
    #[error("only the host may end session {0}")]
    Unauthorized(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] ProtocolError),

    #[error("invalid idea: {0}")]
    InvalidIdea(#[from] IdeaError),

    #[error("to-do id already used: {0}")]
    DuplicateTodoId(String),

    #[error("username is required")]
    MissingUsername,

    #[error("topic is required")]
    MissingTopic,
}

impl From<StoreError> for HandlerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UsernameTaken(name) => Self::UsernameTaken(name),
            StoreError::DuplicateIdeaId(id) => Self::DuplicateTodoId(id),
            other => Self::StoreUnavailable(other),
        }
    }
}

impl HandlerError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "session_not_found",
            Self::UsernameTaken(_) => "username_taken",
            Self::CodeSpaceExhausted(_) => "code_space_exhausted",
            Self::StoreUnavailable(StoreError::Timeout(_)) => "store_timeout",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Unauthorized(_) => "unauthorized",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::InvalidIdea(_) => "invalid_idea",
            Self::DuplicateTodoId(_) => "duplicate_todo_id",
            Self::MissingUsername => "missing_username",
            Self::MissingTopic => "missing_topic",
        }
    }

    /// True for failures of the persistence layer rather than of the request.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::CodeSpaceExhausted(_))
    }

    /// Text for the `error-message` sent back to the requester.
    ///
    /// Returns `None` for outcomes that are deliberately silent.
    pub fn client_message(&self, event: &str) -> Option<String> {
        match self {
            Self::SessionNotFound(_) => Some("Session not found".to_string()),
            Self::UsernameTaken(_) => Some("Username already taken".to_string()),
            Self::InvalidPayload(_) => Some("Invalid request".to_string()),
            Self::InvalidIdea(e) => Some(e.to_string()),
            Self::DuplicateTodoId(_) => {
                Some("A to-do item with that id already exists".to_string())
            }
            Self::MissingUsername => Some("Please enter a username".to_string()),
            Self::MissingTopic => Some("Please enter a topic".to_string()),
            Self::StoreUnavailable(_) | Self::CodeSpaceExhausted(_) => {
                Some(format!("Failed to {}. Please try again.", action(event)))
            }
            Self::Unauthorized(_) => None,
        }
    }
}

/// What the user was trying to do, for generic failure messages.
fn action(event: &str) -> &'static str {
    match event {
        CREATE_SESSION => "create session",
        JOIN_SESSION => "join session",
        NEW_IDEA => "share idea",
        TOGGLE_TODO => "update to-do",
        LEAVE_SESSION => "leave session",
        REQUEST_SESSION_DATA => "load session data",
        END_SESSION => "end session",
        _ => "process request",
    }
}

/// Result type for event handlers.
pub type HandlerResult = Result<(), HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn validation_errors_have_fixed_messages() {
        assert_eq!(
            HandlerError::SessionNotFound("X".into()).client_message(JOIN_SESSION),
            Some("Session not found".into())
        );
        assert_eq!(
            HandlerError::UsernameTaken("bob".into()).client_message(JOIN_SESSION),
            Some("Username already taken".into())
        );
    }

    #[test]
    fn store_failures_do_not_leak_detail() {
        let err = HandlerError::from(StoreError::Timeout(Duration::from_secs(5)));
        let msg = err.client_message(CREATE_SESSION).unwrap();
        assert_eq!(msg, "Failed to create session. Please try again.");
        assert_eq!(err.error_code(), "store_timeout");
        assert!(err.is_internal());

        let err = HandlerError::CodeSpaceExhausted(32);
        assert_eq!(
            err.client_message(CREATE_SESSION).unwrap(),
            "Failed to create session. Please try again."
        );
    }

    #[test]
    fn unauthorized_is_silent() {
        let err = HandlerError::Unauthorized("ABC123".into());
        assert_eq!(err.client_message(END_SESSION), None);
        assert_eq!(err.error_code(), "unauthorized");
    }

    #[test]
    fn store_conflicts_map_to_validation_errors() {
        assert!(matches!(
            HandlerError::from(StoreError::UsernameTaken("bob".into())),
            HandlerError::UsernameTaken(_)
        ));
        assert!(matches!(
            HandlerError::from(StoreError::DuplicateIdeaId("t1".into())),
            HandlerError::DuplicateTodoId(_)
        ));
    }
}
