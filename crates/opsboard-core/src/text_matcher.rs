use crate::lead::Lead;
use crate::task::Task;

/// Case-insensitive substring matcher over task and lead fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatcher {
    needle: String,
}

impl TextMatcher {
    /// Normalize a query string into a matcher. Returns `None` for blank inputs.
    #[must_use]
    pub fn new(query: &str) -> Option<Self> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            needle: trimmed.to_lowercase(),
        })
    }

    /// Normalized needle.
    #[must_use]
    pub fn needle(&self) -> &str {
        &self.needle
    }

    /// Title or subtitle contains the query.
    #[must_use]
    pub fn matches_task(&self, task: &Task) -> bool {
        self.matches_field(&task.title)
            || task
                .subtitle
                .as_deref()
                .is_some_and(|subtitle| self.matches_field(subtitle))
    }

    /// Name, phone, message, source or status contains the query.
    #[must_use]
    pub fn matches_lead(&self, lead: &Lead) -> bool {
        self.matches_field(&lead.full_name)
            || self.matches_field(&lead.phone_number)
            || self.matches_field(&lead.message)
            || self.matches_field(lead.source_label())
            || self.matches_field(lead.status.as_str())
            || self.matches_field(lead.status.label())
    }

    fn matches_field(&self, value: &str) -> bool {
        value.to_lowercase().contains(&self.needle)
    }
}
