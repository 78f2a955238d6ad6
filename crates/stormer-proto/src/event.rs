//! Typed client and server events.
//!
//! Both enums are adjacently tagged, so `ClientEvent::JoinSession(..)`
//! serializes to `{"event": "join-session", "data": {...}}`. Servers usually
//! decode into a [`Frame`](crate::Frame) first and look up a handler by name;
//! the enums are what clients and tests build and read.

use crate::idea::Idea;
use crate::session::Template;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `create-session` event name.
pub const CREATE_SESSION: &str = "create-session";
/// `join-session` event name.
pub const JOIN_SESSION: &str = "join-session";
/// `new-idea` event name.
pub const NEW_IDEA: &str = "new-idea";
/// `toggle-todo` event name.
pub const TOGGLE_TODO: &str = "toggle-todo";
/// `leave-session` event name.
pub const LEAVE_SESSION: &str = "leave-session";
/// `request-session-data` event name.
pub const REQUEST_SESSION_DATA: &str = "request-session-data";
/// `end-session` event name.
pub const END_SESSION: &str = "end-session";

// ============================================================================
// Client -> server payloads
// ============================================================================

/// Open a new board and become its host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSession {
    /// Name the creator appears under.
    pub username: String,
    /// What the session is about.
    pub topic: String,
    /// Board layout.
    #[serde(default)]
    pub template: Template,
}

/// Join an existing board by code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinSession {
    /// Name to appear under; must be free in that session.
    pub username: String,
    /// Session code as typed by the user.
    pub code: String,
}

/// Share an idea with everyone in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIdea {
    /// Target session code.
    pub session: String,
    /// The idea itself, flattened next to `session`.
    #[serde(flatten)]
    pub idea: Idea,
}

/// Flip a to-do item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToggleTodo {
    /// To-do id.
    pub id: String,
    /// Target session code.
    pub session: String,
}

/// Leave a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveSession {
    /// Session being left.
    pub session: String,
    /// Name being removed.
    #[serde(default)]
    pub username: String,
}

/// Ask for a full snapshot of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSessionData {
    /// Session code.
    pub session: String,
}

/// Close a session for everyone. Honoured for the host only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndSession {
    /// Session code.
    pub session: String,
    /// Requesting username, informational.
    #[serde(default)]
    pub username: String,
}

/// Every event a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
#[allow(missing_docs)]
pub enum ClientEvent {
    CreateSession(CreateSession),
    JoinSession(JoinSession),
    NewIdea(NewIdea),
    ToggleTodo(ToggleTodo),
    LeaveSession(LeaveSession),
    RequestSessionData(RequestSessionData),
    EndSession(EndSession),
}

impl ClientEvent {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::CreateSession(_) => CREATE_SESSION,
            ClientEvent::JoinSession(_) => JOIN_SESSION,
            ClientEvent::NewIdea(_) => NEW_IDEA,
            ClientEvent::ToggleTodo(_) => TOGGLE_TODO,
            ClientEvent::LeaveSession(_) => LEAVE_SESSION,
            ClientEvent::RequestSessionData(_) => REQUEST_SESSION_DATA,
            ClientEvent::EndSession(_) => END_SESSION,
        }
    }
}

// ============================================================================
// Server -> client payloads
// ============================================================================

/// Reply to the creator of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCreated {
    /// Freshly allocated code.
    pub code: String,
    /// Creator's name.
    pub username: String,
    /// Session topic.
    pub topic: String,
    /// Board layout.
    pub template: Template,
    /// Roster, just the creator at this point.
    pub users: Vec<String>,
}

/// Reply to a successful join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionJoined {
    /// Session code.
    pub code: String,
    /// Joiner's name.
    pub username: String,
    /// Session topic.
    pub topic: String,
    /// Board layout.
    pub template: Template,
    /// Roster including the joiner.
    pub users: Vec<String>,
    /// Every idea so far, in arrival order.
    pub ideas: Vec<Idea>,
}

/// Updated roster, sent on `user-joined` and `user-left`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    /// Current usernames in join order.
    pub users: Vec<String>,
}

/// An idea as broadcast to a room, tagged with its session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedIdea {
    /// Session the idea belongs to.
    pub session: String,
    /// The idea.
    #[serde(flatten)]
    pub idea: Idea,
}

/// Full snapshot of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Session code.
    pub code: String,
    /// Session topic.
    pub topic: String,
    /// Board layout.
    pub template: Template,
    /// Roster.
    pub users: Vec<String>,
    /// Ideas in arrival order.
    pub ideas: Vec<Idea>,
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
}

/// Notice that a session is gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEnded {
    /// Human-readable reason.
    pub message: String,
}

/// Every event a server may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
#[allow(missing_docs)]
pub enum ServerEvent {
    SessionCreated(SessionCreated),
    SessionJoined(SessionJoined),
    UserJoined(Roster),
    UserLeft(Roster),
    NewIdeaShared(SharedIdea),
    TodoUpdated(SharedIdea),
    SessionData(SessionData),
    SessionEnded(SessionEnded),
    ErrorMessage(String),
}

impl ServerEvent {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::SessionCreated(_) => "session-created",
            ServerEvent::SessionJoined(_) => "session-joined",
            ServerEvent::UserJoined(_) => "user-joined",
            ServerEvent::UserLeft(_) => "user-left",
            ServerEvent::NewIdeaShared(_) => "new-idea-shared",
            ServerEvent::TodoUpdated(_) => "todo-updated",
            ServerEvent::SessionData(_) => "session-data",
            ServerEvent::SessionEnded(_) => "session-ended",
            ServerEvent::ErrorMessage(_) => "error-message",
        }
    }

    /// Shorthand for an `error-message` event.
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::ErrorMessage(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_names_match_serde_tags() {
        let events = [
            ClientEvent::CreateSession(CreateSession {
                username: "a".into(),
                topic: "t".into(),
                template: Template::Default,
            }),
            ClientEvent::JoinSession(JoinSession {
                username: "a".into(),
                code: "ABC123".into(),
            }),
            ClientEvent::NewIdea(NewIdea {
                session: "ABC123".into(),
                idea: Idea::new("a", "x"),
            }),
            ClientEvent::ToggleTodo(ToggleTodo {
                id: "t1".into(),
                session: "ABC123".into(),
            }),
            ClientEvent::LeaveSession(LeaveSession {
                session: "ABC123".into(),
                username: "a".into(),
            }),
            ClientEvent::RequestSessionData(RequestSessionData {
                session: "ABC123".into(),
            }),
            ClientEvent::EndSession(EndSession {
                session: "ABC123".into(),
                username: "a".into(),
            }),
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["event"], event.name());
        }
    }

    #[test]
    fn server_names_match_serde_tags() {
        let events = [
            ServerEvent::UserJoined(Roster { users: vec![] }),
            ServerEvent::UserLeft(Roster { users: vec![] }),
            ServerEvent::SessionEnded(SessionEnded {
                message: "bye".into(),
            }),
            ServerEvent::error("Session not found"),
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["event"], event.name());
        }
    }

    #[test]
    fn error_message_payload_is_bare_string() {
        let value = serde_json::to_value(ServerEvent::error("Username already taken")).unwrap();
        assert_eq!(
            value,
            json!({"event": "error-message", "data": "Username already taken"})
        );
    }

    #[test]
    fn shared_idea_flattens_fields_next_to_session() {
        let shared = SharedIdea {
            session: "ABC123".into(),
            idea: Idea::todo("bob", "Draft budget", "t1"),
        };
        let value = serde_json::to_value(&shared).unwrap();
        assert_eq!(value["session"], "ABC123");
        assert_eq!(value["id"], "t1");
        assert_eq!(value["type"], "todo");
        assert_eq!(value["completed"], false);
    }

    #[test]
    fn create_session_template_defaults() {
        let payload: CreateSession =
            serde_json::from_value(json!({"username": "a", "topic": "t"})).unwrap();
        assert_eq!(payload.template, Template::Default);
    }
}
