use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::calendar::{format_timestamp, parse_timestamp};
use crate::id::TaskId;
use crate::vocab::{Category, Priority};

/// Actionable item on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Record identifier.
    pub id: TaskId,
    /// Short title; never empty for intake-created tasks.
    pub title: String,
    /// Optional second line.
    #[serde(default)]
    pub subtitle: Option<String>,
    /// Assignee key (alias, email or the `self` marker).
    pub assign_to: String,
    /// Task priority.
    #[serde(default)]
    pub priority: Priority,
    /// Board column.
    #[serde(default)]
    pub category: Category,
    /// RFC 3339 due timestamp as stored; may be malformed in old records.
    #[serde(default)]
    pub due_date: Option<String>,
    /// Completion flag.
    #[serde(default)]
    pub done: bool,
    /// Who completed the task; set together with `completed_at`.
    #[serde(default)]
    pub completed_by: Option<String>,
    /// When the task was completed; set together with `completed_by`.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Identity id of the creator.
    #[serde(default)]
    pub creator_id: String,
}

impl Task {
    /// Create an open task with default priority and category.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        assign_to: impl Into<String>,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: TaskId::new(),
            title: title.into(),
            subtitle: None,
            assign_to: assign_to.into(),
            priority: Priority::default(),
            category: Category::default(),
            due_date: None,
            done: false,
            completed_by: None,
            completed_at: None,
            created_at,
            creator_id: String::new(),
        }
    }

    /// Parsed due timestamp; malformed values read as `None`.
    #[must_use]
    pub fn due(&self) -> Option<OffsetDateTime> {
        self.due_date.as_deref().and_then(parse_timestamp)
    }

    /// Overwrite the due timestamp.
    ///
    /// # Errors
    /// Fails when the timestamp cannot be rendered as RFC 3339; the task is left untouched.
    pub fn set_due(&mut self, due: OffsetDateTime) -> Result<(), time::error::Format> {
        self.due_date = Some(format_timestamp(due)?);
        Ok(())
    }

    /// Mark done, stamping who and when.
    pub fn complete(&mut self, by: impl Into<String>, at: OffsetDateTime) {
        self.done = true;
        self.completed_by = Some(by.into());
        self.completed_at = Some(at);
    }

    /// Mark not done, clearing the completion stamp.
    pub fn reopen(&mut self) {
        self.done = false;
        self.completed_by = None;
        self.completed_at = None;
    }

    /// Completion fields agree with the `done` flag.
    #[must_use]
    pub const fn completion_consistent(&self) -> bool {
        self.done == self.completed_by.is_some() && self.done == self.completed_at.is_some()
    }
}
