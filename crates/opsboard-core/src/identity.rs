use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

/// Assignee marker used when the session user has neither alias nor email.
pub const SELF_MARKER: &str = "self";

/// Someone tasks can be assigned to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Directory identifier.
    #[serde(default)]
    pub id: String,
    /// Contact email.
    #[serde(default)]
    pub email: String,
    /// Short display alias.
    #[serde(default)]
    pub alias: String,
}

impl Identity {
    /// Value stored in `Task::assign_to` for this identity.
    #[must_use]
    pub fn assignee_key(&self) -> &str {
        [self.alias.trim(), self.email.trim()]
            .into_iter()
            .find(|value| !value.is_empty())
            .unwrap_or(SELF_MARKER)
    }

    /// Whether `name` refers to this identity (alias or email, case-insensitive).
    #[must_use]
    pub fn answers_to(&self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        [self.alias.trim(), self.email.trim()]
            .into_iter()
            .any(|value| !value.is_empty() && value.to_lowercase() == name.to_lowercase())
    }
}

/// Read-only list of assignable identities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Directory(pub Vec<Identity>);

impl Directory {
    /// Find an identity by alias or email.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Identity> {
        self.0.iter().find(|identity| identity.answers_to(name))
    }

    /// Iterate over every identity.
    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.0.iter()
    }
}

/// Wall clock and user supplied by the hosting session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Current timestamp; its offset defines "local" time.
    pub now: OffsetDateTime,
    /// Signed-in user.
    pub user: Identity,
}

impl Session {
    /// Build a session for `user` at `now`.
    #[must_use]
    pub const fn new(now: OffsetDateTime, user: Identity) -> Self {
        Self { now, user }
    }

    /// Offset used for every local-day computation.
    #[must_use]
    pub const fn offset(&self) -> UtcOffset {
        self.now.offset()
    }

    /// Whether a task assignee string belongs to the session user.
    #[must_use]
    pub fn is_self(&self, assign_to: &str) -> bool {
        let assign_to = assign_to.trim();
        assign_to.eq_ignore_ascii_case(SELF_MARKER)
            || assign_to == self.user.assignee_key()
            || self.user.answers_to(assign_to)
    }
}
