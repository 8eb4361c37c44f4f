use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use time::OffsetDateTime;

use crate::calendar::parse_timestamp;
use crate::id::LeadId;

/// Source bucket for leads without a recorded source.
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Rank given to statuses outside the known vocabulary.
pub const DEFAULT_STATUS_RANK: u32 = 100;

/// Pipeline status of a lead.
///
/// Unknown stored values survive a round trip as [`LeadStatus::Unknown`] and
/// sort after every known status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LeadStatus {
    /// Fresh inquiry, nobody has called yet.
    #[default]
    New,
    /// Promised a call back.
    FollowUp,
    /// Called without reaching the contact.
    NoAnswer,
    /// Spoke with the contact.
    Contacted,
    /// Meeting scheduled; carries an appointment time.
    AppointmentBooked,
    /// Closed as a sale.
    Won,
    /// Outside the business scope.
    NotRelevant,
    /// Went elsewhere.
    Lost,
    /// Any other stored value.
    Unknown(String),
}

impl LeadStatus {
    /// Every known status, most urgent first.
    pub const KNOWN: [Self; 8] = [
        Self::New,
        Self::FollowUp,
        Self::NoAnswer,
        Self::Contacted,
        Self::AppointmentBooked,
        Self::Won,
        Self::NotRelevant,
        Self::Lost,
    ];

    /// Wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "new",
            Self::FollowUp => "follow_up",
            Self::NoAnswer => "no_answer",
            Self::Contacted => "contacted",
            Self::AppointmentBooked => "appointment_booked",
            Self::Won => "won",
            Self::NotRelevant => "not_relevant",
            Self::Lost => "lost",
            Self::Unknown(raw) => raw.as_str(),
        }
    }

    /// Hebrew label shown in the lead table.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::New => "חדש",
            Self::FollowUp => "לחזור אליו",
            Self::NoAnswer => "אין מענה",
            Self::Contacted => "נוצר קשר",
            Self::AppointmentBooked => "נקבעה פגישה",
            Self::Won => "נסגרה עסקה",
            Self::NotRelevant => "לא רלוונטי",
            Self::Lost => "אבד",
            Self::Unknown(raw) => raw.as_str(),
        }
    }

    /// Sort rank; lower is more urgent.
    #[must_use]
    pub const fn rank(&self) -> u32 {
        match self {
            Self::New => 1,
            Self::FollowUp => 2,
            Self::NoAnswer => 3,
            Self::Contacted => 4,
            Self::AppointmentBooked => 5,
            Self::Won => 6,
            Self::NotRelevant => 7,
            Self::Lost => 8,
            Self::Unknown(_) => DEFAULT_STATUS_RANK,
        }
    }

    /// Counts toward the conversion rate.
    #[must_use]
    pub const fn is_converted(&self) -> bool {
        matches!(self, Self::AppointmentBooked | Self::Won)
    }

    /// Status that carries an appointment.
    #[must_use]
    pub const fn books_appointment(&self) -> bool {
        matches!(self, Self::AppointmentBooked)
    }
}

impl From<String> for LeadStatus {
    fn from(raw: String) -> Self {
        let trimmed = raw.trim();
        let lowered = trimmed.to_lowercase().replace(['-', ' '], "_");
        Self::KNOWN
            .into_iter()
            .find(|status| status.as_str() == lowered || status.label() == trimmed)
            .unwrap_or(Self::Unknown(raw))
    }
}

impl From<LeadStatus> for String {
    fn from(status: LeadStatus) -> Self {
        match status {
            LeadStatus::Unknown(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl FromStr for LeadStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_owned()))
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    /// Free-text note.
    pub text: String,
    /// RFC 3339 timestamp as stored; may be missing or malformed.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ConversationEntry {
    /// Parsed timestamp, if valid.
    #[must_use]
    pub fn at(&self) -> Option<OffsetDateTime> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }
}

/// CRM contact record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    /// Record identifier.
    pub id: LeadId,
    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Contact name.
    #[serde(default)]
    pub full_name: String,
    /// Contact phone.
    #[serde(default)]
    pub phone_number: String,
    /// Inquiry text.
    #[serde(default)]
    pub message: String,
    /// Pipeline status.
    #[serde(default)]
    pub status: LeadStatus,
    /// Free-text acquisition channel.
    #[serde(default)]
    pub source: Option<String>,
    /// Conversation log, newest entry first.
    #[serde(default)]
    pub conversation_summary: Vec<ConversationEntry>,
    /// RFC 3339 appointment time; only meaningful while an appointment is booked.
    #[serde(default)]
    pub appointment_date_time: Option<String>,
}

impl Lead {
    /// Create a `New` lead without conversation history.
    #[must_use]
    pub fn new(
        full_name: impl Into<String>,
        phone_number: impl Into<String>,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: LeadId::new(),
            created_at,
            full_name: full_name.into(),
            phone_number: phone_number.into(),
            message: String::new(),
            status: LeadStatus::New,
            source: None,
            conversation_summary: Vec::new(),
            appointment_date_time: None,
        }
    }

    /// Source label with blanks bucketed as [`UNKNOWN_SOURCE`].
    #[must_use]
    pub fn source_label(&self) -> &str {
        self.source
            .as_deref()
            .map(str::trim)
            .filter(|source| !source.is_empty())
            .unwrap_or(UNKNOWN_SOURCE)
    }

    /// Parsed appointment time, if valid.
    #[must_use]
    pub fn appointment(&self) -> Option<OffsetDateTime> {
        self.appointment_date_time.as_deref().and_then(parse_timestamp)
    }
}
