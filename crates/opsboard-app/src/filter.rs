use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

use opsboard_core::calendar::local_date;
use opsboard_core::{Category, Lead, Priority, Session, Task, TextMatcher, VocabularyError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::macros::format_description;
use time::{Date, Duration, UtcOffset};

use crate::ordering::{SortMode, TaskBoard};

/// Error type returned while constructing queries from user-facing inputs.
#[derive(Debug, Error)]
pub enum QueryBuildError {
    #[error("invalid assignee scope: {token}")]
    InvalidScope { token: String },
    #[error("invalid lead window: {token}")]
    InvalidWindow { token: String },
    #[error("invalid lead sort: {token}")]
    InvalidSort { token: String },
    #[error("invalid {field} date '{value}': {source}")]
    InvalidDate {
        field: &'static str,
        value: String,
        #[source]
        source: time::error::Parse,
    },
    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),
}

/// Result alias for query construction helpers.
pub type QueryBuildResult<T> = Result<T, QueryBuildError>;

/// Whose tasks are visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssigneeScope {
    /// Assigned to the session user.
    Mine,
    /// Assigned to anyone else.
    Others,
    /// Everything.
    #[default]
    All,
}

impl FromStr for AssigneeScope {
    type Err = QueryBuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mine" | "me" | "self" => Ok(Self::Mine),
            "others" | "other" => Ok(Self::Others),
            "all" | "" => Ok(Self::All),
            _ => Err(QueryBuildError::InvalidScope { token: s.to_owned() }),
        }
    }
}

/// Conjunction of independent task predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQuery {
    /// Assignee scope.
    pub scope: AssigneeScope,
    /// Include completed tasks.
    pub show_completed: bool,
    /// Exact priority, when set.
    pub priority: Option<Priority>,
    /// Selected columns; empty matches every category.
    pub categories: BTreeSet<Category>,
    /// Title/subtitle search.
    pub text: Option<TextMatcher>,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            scope: AssigneeScope::All,
            show_completed: true,
            priority: None,
            categories: BTreeSet::new(),
            text: None,
        }
    }
}

impl TaskQuery {
    /// Whether a single task passes every predicate.
    #[must_use]
    pub fn matches(&self, task: &Task, session: &Session) -> bool {
        let scope_ok = match self.scope {
            AssigneeScope::All => true,
            AssigneeScope::Mine => session.is_self(&task.assign_to),
            AssigneeScope::Others => !session.is_self(&task.assign_to),
        };
        scope_ok
            && (self.show_completed || !task.done)
            && self.priority.is_none_or(|priority| task.priority == priority)
            && (self.categories.is_empty() || self.categories.contains(&task.category))
            && self.text.as_ref().is_none_or(|matcher| matcher.matches_task(task))
    }

    /// Project the board into the visible task list.
    ///
    /// Manual order is honored only when the board reports it as effective;
    /// otherwise the default comparator applies.
    #[must_use]
    pub fn project<'a>(&self, board: &'a TaskBoard, session: &Session) -> Vec<&'a Task> {
        match board.effective_sort() {
            SortMode::Manual => board
                .ordered()
                .into_iter()
                .filter(|task| self.matches(task, session))
                .collect(),
            SortMode::Auto => {
                let mut visible: Vec<&Task> = board
                    .tasks()
                    .iter()
                    .filter(|task| self.matches(task, session))
                    .collect();
                visible.sort_by(|a, b| compare_tasks(a, b));
                visible
            }
        }
    }
}

/// Default task comparator: open before done, then due date with missing or
/// malformed values last. Callers rely on a stable sort for ties.
#[must_use]
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    a.done.cmp(&b.done).then_with(|| match (a.due(), b.due()) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    })
}

/// Builder that accepts user-facing strings and normalizes them into [`TaskQuery`] values.
#[derive(Debug, Clone, Default)]
pub struct TaskQueryBuilder {
    query: TaskQuery,
}

impl TaskQueryBuilder {
    /// Create a builder matching every task.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the assignee scope from a token (`mine`, `others`, `all`).
    ///
    /// # Errors
    /// Returns an error for unrecognized tokens.
    pub fn with_scope(mut self, token: &str) -> QueryBuildResult<Self> {
        self.query.scope = token.parse()?;
        Ok(self)
    }

    /// Toggle visibility of completed tasks.
    #[must_use]
    pub const fn with_completed(mut self, show: bool) -> Self {
        self.query.show_completed = show;
        self
    }

    /// Restrict to one priority; blank clears the predicate.
    ///
    /// # Errors
    /// Returns an error when the token is not a known priority.
    pub fn with_priority(mut self, token: Option<&str>) -> QueryBuildResult<Self> {
        self.query.priority = match token.map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse()?),
        };
        Ok(self)
    }

    /// Extend the selected category set.
    ///
    /// # Errors
    /// Returns an error when any token is not a known category.
    pub fn with_categories(mut self, tokens: &[String]) -> QueryBuildResult<Self> {
        for token in tokens {
            self.query.categories.insert(token.parse()?);
        }
        Ok(self)
    }

    /// Configure the search text (whitespace-only inputs clear it).
    #[must_use]
    pub fn with_text(mut self, text: Option<&str>) -> Self {
        self.query.text = text.and_then(TextMatcher::new);
        self
    }

    /// Build the final [`TaskQuery`].
    #[must_use]
    pub fn build(self) -> TaskQuery {
        self.query
    }
}

/// Creation-time predicate for the lead table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LeadWindow {
    /// No time predicate.
    #[default]
    All,
    /// Created on or after the start of the day seven days ago.
    Last7Days,
    /// Created on or after the start of the day thirty days ago.
    Last30Days,
    /// Created within `from..=to`, whole local days.
    Range {
        /// First day.
        from: Date,
        /// Last day.
        to: Date,
    },
}

impl LeadWindow {
    /// Whether a lead created at `lead.created_at` falls inside the window.
    #[must_use]
    pub fn contains(&self, lead: &Lead, today: Date, offset: UtcOffset) -> bool {
        let created = local_date(lead.created_at, offset);
        match *self {
            Self::All => true,
            Self::Last7Days => rolling_start(today, 7).is_none_or(|start| created >= start),
            Self::Last30Days => rolling_start(today, 30).is_none_or(|start| created >= start),
            Self::Range { from, to } => {
                let (from, to) = if to < from { (to, from) } else { (from, to) };
                (from..=to).contains(&created)
            }
        }
    }
}

fn rolling_start(today: Date, days: i64) -> Option<Date> {
    today.checked_sub(Duration::days(days))
}

/// Lead table ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSort {
    /// Status rank, then oldest first.
    #[default]
    StatusPriority,
    /// Oldest first.
    CreatedAsc,
    /// Newest first.
    CreatedDesc,
}

impl FromStr for LeadSort {
    type Err = QueryBuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "status" | "status_priority" | "priority" => Ok(Self::StatusPriority),
            "oldest" | "created_asc" | "asc" => Ok(Self::CreatedAsc),
            "newest" | "created_desc" | "desc" => Ok(Self::CreatedDesc),
            _ => Err(QueryBuildError::InvalidSort { token: s.to_owned() }),
        }
    }
}

impl LeadSort {
    /// Comparator for this mode.
    #[must_use]
    pub fn compare(self, a: &Lead, b: &Lead) -> Ordering {
        match self {
            Self::StatusPriority => a
                .status
                .rank()
                .cmp(&b.status.rank())
                .then_with(|| a.created_at.cmp(&b.created_at)),
            Self::CreatedAsc => a.created_at.cmp(&b.created_at),
            Self::CreatedDesc => b.created_at.cmp(&a.created_at),
        }
    }
}

/// Window, search and ordering for the lead table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadQuery {
    /// Creation-time predicate.
    pub window: LeadWindow,
    /// Search across contact fields, source and status.
    pub text: Option<TextMatcher>,
    /// Ordering mode.
    pub sort: LeadSort,
}

impl LeadQuery {
    /// Project leads into the visible, sorted list.
    #[must_use]
    pub fn project<'a>(&self, leads: &'a [Lead], session: &Session) -> Vec<&'a Lead> {
        let offset = session.offset();
        let today = session.now.date();
        let mut visible: Vec<&Lead> = leads
            .iter()
            .filter(|lead| self.window.contains(lead, today, offset))
            .filter(|lead| self.text.as_ref().is_none_or(|matcher| matcher.matches_lead(lead)))
            .collect();
        visible.sort_by(|a, b| self.sort.compare(a, b));
        visible
    }
}

/// Builder for [`LeadQuery`] from user-facing tokens.
#[derive(Debug, Clone, Default)]
pub struct LeadQueryBuilder {
    query: LeadQuery,
}

impl LeadQueryBuilder {
    /// Create a builder matching every lead.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a rolling window (`all`, `7d`, `30d`).
    ///
    /// # Errors
    /// Returns an error for unrecognized tokens.
    pub fn with_window(mut self, token: &str) -> QueryBuildResult<Self> {
        self.query.window = match token.trim().to_ascii_lowercase().as_str() {
            "" | "all" => LeadWindow::All,
            "7" | "7d" | "week" => LeadWindow::Last7Days,
            "30" | "30d" | "month" => LeadWindow::Last30Days,
            _ => {
                return Err(QueryBuildError::InvalidWindow {
                    token: token.to_owned(),
                });
            }
        };
        Ok(self)
    }

    /// Select an explicit `YYYY-MM-DD` range; inverted bounds are swapped.
    ///
    /// # Errors
    /// Returns an error if either date fails to parse.
    pub fn with_range(mut self, from: &str, to: &str) -> QueryBuildResult<Self> {
        let from = parse_day("from", from)?;
        let to = parse_day("to", to)?;
        self.query.window = if to < from {
            LeadWindow::Range { from: to, to: from }
        } else {
            LeadWindow::Range { from, to }
        };
        Ok(self)
    }

    /// Configure the search text.
    #[must_use]
    pub fn with_text(mut self, text: Option<&str>) -> Self {
        self.query.text = text.and_then(TextMatcher::new);
        self
    }

    /// Select the ordering mode from a token.
    ///
    /// # Errors
    /// Returns an error for unrecognized tokens.
    pub fn with_sort(mut self, token: &str) -> QueryBuildResult<Self> {
        self.query.sort = token.parse()?;
        Ok(self)
    }

    /// Build the final [`LeadQuery`].
    #[must_use]
    pub fn build(self) -> LeadQuery {
        self.query
    }
}

/// Parse a `YYYY-MM-DD` calendar day.
///
/// # Errors
/// Returns an error if the value is not a valid calendar date.
pub fn parse_day(field: &'static str, value: &str) -> QueryBuildResult<Date> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]")).map_err(|source| {
        QueryBuildError::InvalidDate {
            field,
            value: value.to_owned(),
            source,
        }
    })
}
