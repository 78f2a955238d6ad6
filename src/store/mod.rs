//! Session store abstraction.
//!
//! The board never touches a concrete backend; it holds an
//! `Arc<dyn SessionStore>` chosen at startup. Besides plain CRUD the trait
//! exposes atomic primitives (push-if-absent, remove-and-close, toggle by id)
//! so concurrent events against one session cannot lose each other's writes.
//!
//! Expired sessions are invisible to every read. They are physically removed
//! by [`SessionStore::purge_expired`], which the sweeper calls periodically.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;
use stormer_proto::{Idea, Template};
use thiserror::Error;

pub mod memory;
pub mod sqlite;
pub mod timed;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use timed::TimedStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session code already in use: {0}")]
    DuplicateCode(String),
    #[error("username already taken: {0}")]
    UsernameTaken(String),
    #[error("to-do id already used in session: {0}")]
    DuplicateIdeaId(String),
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// One brainstorming session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub code: String,
    pub topic: String,
    pub template: Template,
    /// Usernames in join order, no duplicates.
    pub users: Vec<String>,
    /// Ideas in arrival order.
    pub ideas: Vec<Idea>,
    /// Connection id of the creator. Never reassigned.
    pub host: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// A fresh session whose only member is its creator.
    pub fn new(
        code: impl Into<String>,
        topic: impl Into<String>,
        template: Template,
        host: impl Into<String>,
        creator: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            topic: topic.into(),
            template,
            users: vec![creator.into()],
            ideas: Vec::new(),
            host: host.into(),
            created_at: Utc::now(),
        }
    }

    pub fn has_user(&self, username: &str) -> bool {
        self.users.iter().any(|u| u == username)
    }

    pub fn has_todo(&self, id: &str) -> bool {
        self.ideas.iter().any(|idea| idea.todo_id() == Some(id))
    }

    pub fn is_expired(&self, now: DateTime<Utc>, retention: TimeDelta) -> bool {
        self.created_at + retention <= now
    }
}

/// Result of removing a user from a roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterChange {
    /// The session lives on with these users.
    Remaining(Vec<String>),
    /// The roster emptied and the session was deleted in the same step.
    Closed,
    /// No live session with that code.
    Missing,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Backend name for diagnostics.
    fn backend(&self) -> &'static str;

    /// Insert a new session. Fails with `DuplicateCode` if the code is live.
    async fn create(&self, session: Session) -> Result<Session, StoreError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<Session>, StoreError>;

    /// Overwrite topic, template, roster and ideas of a live session.
    /// Returns false when the session does not exist.
    async fn save(&self, session: &Session) -> Result<bool, StoreError>;

    async fn delete(&self, code: &str) -> Result<bool, StoreError>;

    async fn count_all(&self) -> Result<usize, StoreError>;

    /// Newest sessions first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<Session>, StoreError>;

    /// Every live session, oldest first.
    async fn list_all(&self) -> Result<Vec<Session>, StoreError>;

    /// Append `username` unless present. `None` if the session is missing.
    async fn add_user(&self, code: &str, username: &str) -> Result<Option<Session>, StoreError>;

    /// Remove `username` (no-op if absent), deleting the session if it empties.
    async fn remove_user(&self, code: &str, username: &str) -> Result<RosterChange, StoreError>;

    /// Append an idea. `None` if the session is missing.
    async fn push_idea(&self, code: &str, idea: Idea) -> Result<Option<Idea>, StoreError>;

    /// Flip `completed` on the to-do with `id`. `None` if there is no such to-do.
    async fn toggle_todo(&self, code: &str, id: &str) -> Result<Option<Idea>, StoreError>;

    /// Delete sessions past retention at `now`, returning their codes.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<String>, StoreError>;
}

/// Convert the configured retention into a chrono delta.
pub fn retention_delta(retention: Duration) -> TimeDelta {
    TimeDelta::from_std(retention).unwrap_or(TimeDelta::MAX)
}
