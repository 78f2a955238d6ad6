//! Session-level protocol types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Board layout chosen when a session is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    /// Free-form idea wall.
    #[default]
    Default,
    /// To-do list with priorities and due dates.
    Todo,
    /// Strengths / weaknesses / opportunities / threats grid.
    Swot,
}

impl Template {
    /// Wire name of the template.
    pub fn as_str(&self) -> &'static str {
        match self {
            Template::Default => "default",
            Template::Todo => "todo",
            Template::Swot => "swot",
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown template name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTemplate(pub String);

impl fmt::Display for UnknownTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown template '{}'", self.0)
    }
}

impl std::error::Error for UnknownTemplate {}

impl FromStr for Template {
    type Err = UnknownTemplate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Template::Default),
            "todo" => Ok(Template::Todo),
            "swot" => Ok(Template::Swot),
            other => Err(UnknownTemplate(other.to_string())),
        }
    }
}
