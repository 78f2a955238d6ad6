//! Idea records shared on a board.
//!
//! One flat struct covers all three kinds. Todo-only and SWOT-only fields are
//! optional and skipped on the wire when absent, so a plain idea serializes to
//! `{text, user, timestamp, type}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of an idea card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdeaKind {
    /// Free text.
    #[default]
    Idea,
    /// Toggleable to-do item.
    Todo,
    /// Entry in one SWOT quadrant.
    Swot,
}

/// To-do priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Urgent.
    High,
    /// Normal.
    Medium,
    /// Whenever.
    Low,
}

/// SWOT quadrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwotCategory {
    /// Internal, helpful.
    Strengths,
    /// Internal, harmful.
    Weaknesses,
    /// External, helpful.
    Opportunities,
    /// External, harmful.
    Threats,
}

/// A single idea, to-do item or SWOT entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    /// Card text.
    #[serde(default)]
    pub text: String,
    /// Submitting username.
    #[serde(default)]
    pub user: String,
    /// Submission time. Stamped by the server when the client omits it.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Card kind.
    #[serde(rename = "type", default)]
    pub kind: IdeaKind,
    /// Client-generated id, required for to-do items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// To-do priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// To-do due date, kept verbatim as sent (`YYYY-MM-DD` from date inputs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// To-do completion flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// SWOT quadrant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<SwotCategory>,
}

/// Reasons an idea cannot be added to a board.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdeaError {
    /// Text was empty or whitespace.
    #[error("Idea text cannot be empty")]
    EmptyText,
    /// A to-do item arrived without an id.
    #[error("To-do items need an id")]
    MissingTodoId,
    /// A SWOT entry arrived without a quadrant.
    #[error("SWOT entries need a category")]
    MissingCategory,
}

impl Idea {
    /// A plain idea stamped with the current time.
    pub fn new(user: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            user: user.into(),
            timestamp: Utc::now(),
            kind: IdeaKind::Idea,
            id: None,
            priority: None,
            due_date: None,
            completed: None,
            category: None,
        }
    }

    /// An open to-do item.
    pub fn todo(user: impl Into<String>, text: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: IdeaKind::Todo,
            id: Some(id.into()),
            completed: Some(false),
            ..Self::new(user, text)
        }
    }

    /// A SWOT entry in the given quadrant.
    pub fn swot(user: impl Into<String>, text: impl Into<String>, category: SwotCategory) -> Self {
        Self {
            kind: IdeaKind::Swot,
            category: Some(category),
            ..Self::new(user, text)
        }
    }

    /// True for to-do items.
    pub fn is_todo(&self) -> bool {
        self.kind == IdeaKind::Todo
    }

    /// The id a to-do item is addressed by, if this is one.
    pub fn todo_id(&self) -> Option<&str> {
        if self.is_todo() {
            self.id.as_deref()
        } else {
            None
        }
    }

    /// Check the idea can be stored as-is.
    pub fn validate(&self) -> Result<(), IdeaError> {
        if self.text.trim().is_empty() {
            return Err(IdeaError::EmptyText);
        }
        match self.kind {
            IdeaKind::Todo if self.id.as_deref().is_none_or(|id| id.trim().is_empty()) => {
                Err(IdeaError::MissingTodoId)
            }
            IdeaKind::Swot if self.category.is_none() => Err(IdeaError::MissingCategory),
            _ => Ok(()),
        }
    }

    /// Fill in defaults a stored idea must carry. To-do items start open.
    pub fn normalize(&mut self) {
        if self.is_todo() && self.completed.is_none() {
            self.completed = Some(false);
        }
    }

    /// Flip the completion flag and return the new value.
    pub fn toggle(&mut self) -> bool {
        let done = !self.completed.unwrap_or(false);
        self.completed = Some(done);
        done
    }
}
