//! Domain types for the operations dashboard: tasks, leads, vocabularies and
//! the session context the core operations run against.

/// Date helpers anchored to the session offset.
pub mod calendar;
/// Identifier types.
pub mod id;
/// Assignable identities and the session context.
pub mod identity;
/// Lead records and status vocabulary.
pub mod lead;
/// Task records.
pub mod task;
/// Case-insensitive text search.
pub mod text_matcher;
/// Closed task vocabularies.
pub mod vocab;

pub use id::{LeadId, TaskId};
pub use identity::{Directory, Identity, SELF_MARKER, Session};
pub use lead::{ConversationEntry, DEFAULT_STATUS_RANK, Lead, LeadStatus, UNKNOWN_SOURCE};
pub use task::Task;
pub use text_matcher::TextMatcher;
pub use vocab::{Category, Priority, VocabularyError};
