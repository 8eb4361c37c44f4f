use std::collections::HashMap;

use opsboard_core::calendar::{format_timestamp, parse_timestamp};
use opsboard_core::{Category, ConversationEntry, Lead, LeadId, LeadStatus, Session, Task};
use time::OffsetDateTime;

/// Result of a status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// Lead after the change.
    pub lead: Lead,
    /// Reminder task created when an appointment was booked.
    pub follow_up: Option<Task>,
}

/// In-memory lead collection between store snapshots.
#[derive(Debug, Clone, Default)]
pub struct LeadBook {
    leads: Vec<Lead>,
    lead_index: HashMap<LeadId, usize>,
}

impl LeadBook {
    /// Book over a store snapshot.
    #[must_use]
    pub fn new(leads: Vec<Lead>) -> Self {
        let mut book = Self::default();
        book.replace_snapshot(leads);
        book
    }

    /// Leads in collection order.
    #[must_use]
    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    /// Look up a lead.
    #[must_use]
    pub fn get(&self, id: LeadId) -> Option<&Lead> {
        self.lead_index.get(&id).and_then(|&idx| self.leads.get(idx))
    }

    fn get_mut(&mut self, id: LeadId) -> Option<&mut Lead> {
        let idx = *self.lead_index.get(&id)?;
        self.leads.get_mut(idx)
    }

    /// Add a lead, or overwrite the one with the same id.
    pub fn insert(&mut self, lead: Lead) {
        if let Some(existing) = self.get_mut(lead.id) {
            *existing = lead;
            return;
        }
        self.lead_index.insert(lead.id, self.leads.len());
        self.leads.push(lead);
    }

    /// Move a lead to `status`.
    ///
    /// Entering `AppointmentBooked` records `appointment` and creates a
    /// reminder task for the session user. Leaving it clears the appointment.
    pub fn set_status(
        &mut self,
        id: LeadId,
        status: LeadStatus,
        appointment: Option<&str>,
        session: &Session,
    ) -> Option<StatusChange> {
        let Some(lead) = self.get_mut(id) else {
            tracing::warn!(%id, "status change skipped: lead not found");
            return None;
        };

        let entering = status.books_appointment() && !lead.status.books_appointment();
        if status.books_appointment() {
            if let Some(raw) = appointment {
                lead.appointment_date_time = normalize_appointment(id, raw);
            }
        } else {
            lead.appointment_date_time = None;
        }
        tracing::debug!(%id, from = %lead.status, to = %status, "lead status changed");
        lead.status = status;

        let follow_up = entering.then(|| confirmation_task(lead, session));
        Some(StatusChange {
            lead: lead.clone(),
            follow_up,
        })
    }

    /// Replace the appointment time of a booked lead.
    ///
    /// Input that does not parse clears the stored appointment.
    pub fn edit_appointment(&mut self, id: LeadId, raw: &str) -> Option<&Lead> {
        let Some(lead) = self.get_mut(id) else {
            tracing::warn!(%id, "appointment edit skipped: lead not found");
            return None;
        };
        if !lead.status.books_appointment() {
            tracing::warn!(
                %id,
                status = %lead.status,
                "appointment edit skipped: no appointment booked"
            );
            return None;
        }
        lead.appointment_date_time = normalize_appointment(id, raw);
        Some(&*lead)
    }

    /// Prepend a note to the conversation log.
    pub fn add_conversation(
        &mut self,
        id: LeadId,
        text: &str,
        now: OffsetDateTime,
    ) -> Option<&Lead> {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!(%id, "empty conversation note ignored");
            return None;
        }
        let Some(lead) = self.get_mut(id) else {
            tracing::warn!(%id, "conversation note skipped: lead not found");
            return None;
        };
        let timestamp = match format_timestamp(now) {
            Ok(formatted) => Some(formatted),
            Err(err) => {
                tracing::warn!(%id, %err, "conversation note stored without timestamp");
                None
            }
        };
        lead.conversation_summary.insert(
            0,
            ConversationEntry {
                text: text.to_owned(),
                timestamp,
            },
        );
        Some(&*lead)
    }

    /// Replace the whole collection with a store snapshot.
    pub fn replace_snapshot(&mut self, leads: Vec<Lead>) {
        self.leads = leads;
        self.lead_index.clear();
        for (idx, lead) in self.leads.iter().enumerate() {
            self.lead_index.insert(lead.id, idx);
        }
    }
}

fn normalize_appointment(id: LeadId, raw: &str) -> Option<String> {
    let parsed = parse_timestamp(raw).and_then(|at| format_timestamp(at).ok());
    if parsed.is_none() {
        tracing::warn!(%id, raw, "unparsable appointment time; appointment cleared");
    }
    parsed
}

fn confirmation_task(lead: &Lead, session: &Session) -> Task {
    let mut task = Task::new(
        format!("Confirm appointment with {}", lead.full_name.trim()),
        session.user.assignee_key(),
        session.now,
    );
    task.subtitle = Some(lead.phone_number.clone()).filter(|phone| !phone.trim().is_empty());
    task.category = Category::Clients;
    task.due_date.clone_from(&lead.appointment_date_time);
    task.creator_id.clone_from(&session.user.id);
    task
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsboard_core::Identity;
    use time::macros::datetime;

    const BOOKED_AT: &str = "2025-10-20T11:30:00+03:00";
    const REBOOKED_AT: &str = "2025-10-21T11:30:00+03:00";

    fn session() -> Session {
        Session::new(
            datetime!(2025-10-17 10:00 +3),
            Identity {
                id: "u-1".into(),
                email: "dana@example.com".into(),
                alias: "dana".into(),
            },
        )
    }

    fn book() -> (LeadBook, LeadId) {
        let lead = Lead::new("Noa Levi", "052-1234567", datetime!(2025-10-15 9:00 +3));
        let id = lead.id;
        (LeadBook::new(vec![lead]), id)
    }

    #[test]
    fn booking_records_appointment_and_spawns_reminder() {
        let (mut book, id) = book();
        let change = book
            .set_status(id, LeadStatus::AppointmentBooked, Some(BOOKED_AT), &session())
            .unwrap_or_else(|| panic!("lead exists"));

        assert_eq!(change.lead.status, LeadStatus::AppointmentBooked);
        assert_eq!(change.lead.appointment(), Some(datetime!(2025-10-20 11:30 +3)));
        let task = change.follow_up.unwrap_or_else(|| panic!("reminder expected"));
        assert_eq!(task.category, Category::Clients);
        assert_eq!(task.assign_to, "dana");
        assert_eq!(task.creator_id, "u-1");
        assert_eq!(task.due(), Some(datetime!(2025-10-20 11:30 +3)));
        assert!(task.title.contains("Noa Levi"));
    }

    #[test]
    fn rebooking_does_not_spawn_second_reminder() {
        let (mut book, id) = book();
        let session = session();
        let _ = book.set_status(id, LeadStatus::AppointmentBooked, Some(BOOKED_AT), &session);
        let change = book
            .set_status(id, LeadStatus::AppointmentBooked, Some(REBOOKED_AT), &session)
            .unwrap_or_else(|| panic!("lead exists"));
        assert!(change.follow_up.is_none());
        assert_eq!(change.lead.appointment(), Some(datetime!(2025-10-21 11:30 +3)));
    }

    #[test]
    fn leaving_booked_status_clears_appointment() {
        let (mut book, id) = book();
        let session = session();
        let _ = book.set_status(id, LeadStatus::AppointmentBooked, Some(BOOKED_AT), &session);
        let change = book
            .set_status(id, LeadStatus::Won, None, &session)
            .unwrap_or_else(|| panic!("lead exists"));
        assert!(change.lead.appointment_date_time.is_none());
        assert!(change.follow_up.is_none());
    }

    #[test]
    fn unparsable_appointment_edit_clears_value() {
        let (mut book, id) = book();
        let _ = book.set_status(id, LeadStatus::AppointmentBooked, Some(BOOKED_AT), &session());
        let lead = book.edit_appointment(id, "next tuesday").cloned();
        assert!(lead.is_some_and(|lead| lead.appointment_date_time.is_none()));
    }

    #[test]
    fn appointment_edit_requires_booked_status() {
        let (mut book, id) = book();
        assert!(book.edit_appointment(id, "2025-10-20T11:30:00+03:00").is_none());
        assert!(book.get(id).is_some_and(|lead| lead.appointment_date_time.is_none()));
    }

    #[test]
    fn conversation_notes_are_prepended() {
        let (mut book, id) = book();
        let _ = book.add_conversation(id, "left voicemail", datetime!(2025-10-15 12:00 +3));
        let _ = book.add_conversation(id, "  booked a call  ", datetime!(2025-10-16 12:00 +3));
        assert!(book.add_conversation(id, "   ", datetime!(2025-10-16 13:00 +3)).is_none());

        let log = book.get(id).map(|lead| lead.conversation_summary.clone()).unwrap_or_default();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].text, "booked a call");
        assert_eq!(log[0].at(), Some(datetime!(2025-10-16 12:00 +3)));
        assert_eq!(log[1].text, "left voicemail");
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let (mut book, _) = book();
        let missing = LeadId::new();
        assert!(book.set_status(missing, LeadStatus::Won, None, &session()).is_none());
        assert!(book.add_conversation(missing, "hi", datetime!(2025-10-16 12:00 +3)).is_none());
        assert_eq!(book.leads().len(), 1);
    }

    #[test]
    fn snapshot_replace_rebuilds_index() {
        let (mut book, id) = book();
        let other = Lead::new("Avi", "050", datetime!(2025-10-16 9:00 +3));
        let other_id = other.id;
        book.replace_snapshot(vec![other]);
        assert!(book.get(id).is_none());
        assert!(book.get(other_id).is_some());
    }
}
