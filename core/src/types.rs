//! Domain values and wire DTOs for the todo API.
//!
//! # Design
//! The remote API, the embedded database and the list screen all carry the
//! same five fields, so a single `Todo` value serves as DTO and domain model.
//! The JSON shape uses `isDone` and RFC 3339 dates; the serde attributes here
//! are the only place that knows about it.
//!
//! These types mirror the mock-server's schema but are defined independently.
//! Integration tests catch any schema drift between the two crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single todo record.
///
/// Values are immutable in spirit: edits go through `with_done` /
/// `with_changes`, which return a new value and leave `self` untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub contents: String,
    #[serde(rename = "isDone")]
    pub is_done: bool,
}

impl Todo {
    /// Copy of this todo with the completion flag set to `is_done`.
    pub fn with_done(&self, is_done: bool) -> Self {
        Self {
            is_done,
            ..self.clone()
        }
    }

    /// Copy of this todo with every present field of `changes` applied.
    /// The identifier and completion flag are preserved.
    pub fn with_changes(&self, changes: &TodoChanges) -> Self {
        Self {
            id: self.id.clone(),
            title: changes.title.clone().unwrap_or_else(|| self.title.clone()),
            date: changes.date.unwrap_or(self.date),
            contents: changes
                .contents
                .clone()
                .unwrap_or_else(|| self.contents.clone()),
            is_done: self.is_done,
        }
    }
}

/// Request payload for creating a new todo. The backing store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub contents: String,
    pub date: DateTime<Utc>,
}

/// Field edits for an existing todo. Omitted fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoChanges {
    pub title: Option<String>,
    pub contents: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl TodoChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.contents.is_none() && self.date.is_none()
    }
}

/// Body returned by the delete endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeletedTodo {
    pub id: String,
}
