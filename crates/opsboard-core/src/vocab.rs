use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Rejection raised when a token is not part of a closed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VocabularyError {
    /// The token does not name any [`Category`].
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    /// The token does not name any [`Priority`].
    #[error("unknown priority: {0}")]
    UnknownPriority(String),
}

/// Fixed task category vocabulary, in declaration order.
///
/// Declaration order matters: free-text intake picks the first category whose
/// keyword occurs in the sentence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Buying supplies and services.
    Purchasing,
    /// Incoming and outgoing payments.
    Payments,
    /// Client follow-ups.
    Clients,
    /// Campaigns and outreach.
    Marketing,
    /// Office and back-office chores.
    Administration,
    /// Fallback bucket.
    #[default]
    Other,
}

impl Category {
    /// Every category in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Purchasing,
        Self::Payments,
        Self::Clients,
        Self::Marketing,
        Self::Administration,
        Self::Other,
    ];

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Purchasing => "purchasing",
            Self::Payments => "payments",
            Self::Clients => "clients",
            Self::Marketing => "marketing",
            Self::Administration => "administration",
            Self::Other => "other",
        }
    }

    /// Hebrew board label, as shown on the kanban column header.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Purchasing => "רכש",
            Self::Payments => "תשלומים",
            Self::Clients => "לקוחות",
            Self::Marketing => "שיווק",
            Self::Administration => "ניהול",
            Self::Other => "אחר",
        }
    }

    /// Lowercase keywords recognised by the intake parser.
    #[must_use]
    pub const fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Purchasing => &["purchas", "supplier", "רכש", "קנייה", "ספק"],
            Self::Payments => &["payment", "invoice", "תשלום", "חשבונית"],
            Self::Clients => &["client", "customer", "לקוח"],
            Self::Marketing => &["marketing", "campaign", "שיווק", "קמפיין"],
            Self::Administration => &["admin", "office", "ניהול", "משרד"],
            Self::Other => &[],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        let lowered = token.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == lowered || category.label() == token)
            .ok_or_else(|| VocabularyError::UnknownCategory(token.to_owned()))
    }
}

/// Task priority.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Needs attention today.
    Urgent,
    /// Regular work.
    #[default]
    Normal,
    /// Can wait.
    Low,
}

impl Priority {
    /// Every priority, most urgent first.
    pub const ALL: [Self; 3] = [Self::Urgent, Self::Normal, Self::Low];

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Urgent => "דחוף",
            Self::Normal => "רגיל",
            Self::Low => "נמוך",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        let lowered = token.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str() == lowered || priority.label() == token)
            .ok_or_else(|| VocabularyError::UnknownPriority(token.to_owned()))
    }
}
