//! Command façade shared by the CLI and tests.
//!
//! Every command is applied to the in-memory collections first and then
//! written through to the store. A failed write is reported to the caller but
//! does not roll back the in-memory change; the next [`DashboardService::sync`]
//! restores whatever the store actually holds.

use anyhow::{Error, Result};
use opsboard_core::{Category, Directory, Lead, LeadId, LeadStatus, Session, Task, TaskId};
use time::{Date, OffsetDateTime};

use crate::analytics::{AnalyticsWindow, LeadAnalytics, compute_analytics, compute_custom_analytics};
use crate::filter::{LeadQuery, TaskQuery};
use crate::intake::{IntakeParser, IntakeRequest, KeywordIntakeParser};
use crate::leads::{LeadBook, StatusChange};
use crate::ordering::{DragOutcome, DragState, DropTarget, TaskBoard, ViewMode};
use crate::store::RecordStore;

/// Service façade that owns the in-memory collections between syncs.
pub struct DashboardService<S, P = KeywordIntakeParser> {
    store: S,
    parser: P,
    directory: Directory,
    board: TaskBoard,
    leads: LeadBook,
}

impl<S: RecordStore> DashboardService<S> {
    /// Open the service with the keyword parser.
    ///
    /// # Errors
    /// Returns an error when the initial snapshot cannot be loaded.
    pub fn open(store: S, directory: Directory, parser: KeywordIntakeParser) -> Result<Self> {
        Self::with_parser(store, directory, parser)
    }
}

impl<S: RecordStore, P: IntakeParser> DashboardService<S, P> {
    /// Open the service with a custom intake parser.
    ///
    /// # Errors
    /// Returns an error when the initial snapshot cannot be loaded.
    pub fn with_parser(store: S, directory: Directory, parser: P) -> Result<Self> {
        let tasks = loaded(store.load_tasks(), "load tasks")?;
        let leads = loaded(store.load_leads(), "load leads")?;
        let layout = loaded(store.load_layout(), "load board layout")?;
        tracing::debug!(tasks = tasks.len(), leads = leads.len(), "dashboard snapshot loaded");
        Ok(Self {
            store,
            parser,
            directory,
            board: TaskBoard::with_layout(tasks, layout),
            leads: LeadBook::new(leads),
        })
    }

    /// Replace both collections with a fresh store snapshot.
    ///
    /// # Errors
    /// Returns an error when the store cannot be read; the current state is kept.
    pub fn sync(&mut self) -> Result<()> {
        let tasks = loaded(self.store.load_tasks(), "load tasks")?;
        let leads = loaded(self.store.load_leads(), "load leads")?;
        self.board.replace_snapshot(tasks);
        self.leads.replace_snapshot(leads);
        Ok(())
    }

    /// Task board.
    #[must_use]
    pub const fn board(&self) -> &TaskBoard {
        &self.board
    }

    /// Lead collection.
    #[must_use]
    pub const fn lead_book(&self) -> &LeadBook {
        &self.leads
    }

    /// Assignable identities.
    #[must_use]
    pub const fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Parse free text into a task and add it to the board.
    ///
    /// # Errors
    /// Returns an error when the new task cannot be persisted.
    pub fn add_task(
        &mut self,
        text: &str,
        category: Option<Category>,
        session: &Session,
    ) -> Result<Task> {
        let task = self.parser.parse(&IntakeRequest {
            text,
            category,
            directory: &self.directory,
            session,
        });
        tracing::info!(
            id = %task.id,
            category = %task.category,
            assign_to = %task.assign_to,
            "task added"
        );
        self.board.insert(task.clone());
        persisted(self.store.upsert_task(&task), "store new task")?;
        self.save_layout()?;
        Ok(task)
    }

    /// Visible tasks for `query`.
    #[must_use]
    pub fn tasks(&self, query: &TaskQuery, session: &Session) -> Vec<&Task> {
        query.project(&self.board, session)
    }

    /// Move `active` to the position of `over`.
    ///
    /// # Errors
    /// Returns an error when the new order cannot be persisted.
    pub fn reorder(&mut self, active: TaskId, over: TaskId) -> Result<DragOutcome> {
        let outcome = self.board.reorder(active, over);
        self.persist_outcome(active, outcome)
    }

    /// Move `active` to another column.
    ///
    /// # Errors
    /// Returns an error when the task cannot be persisted.
    pub fn recategorize(&mut self, active: TaskId, destination: &str) -> Result<DragOutcome> {
        let outcome = self.board.recategorize(active, destination);
        self.persist_outcome(active, outcome)
    }

    /// Move `active` to another calendar day.
    ///
    /// # Errors
    /// Returns an error when the task cannot be persisted.
    pub fn schedule(
        &mut self,
        active: TaskId,
        date: Date,
        session: &Session,
    ) -> Result<DragOutcome> {
        let outcome = self.board.schedule_on_calendar(active, date, session.offset());
        self.persist_outcome(active, outcome)
    }

    /// Start a drag gesture.
    pub fn begin_drag(&mut self, active: TaskId) -> bool {
        self.board.begin_drag(active)
    }

    /// Abandon the current drag gesture.
    pub fn cancel_drag(&mut self) {
        self.board.cancel_drag();
    }

    /// Finish the current drag gesture.
    ///
    /// # Errors
    /// Returns an error when the resulting mutation cannot be persisted.
    pub fn end_drag(
        &mut self,
        target: Option<DropTarget>,
        session: &Session,
    ) -> Result<DragOutcome> {
        let active = match self.board.drag_state() {
            DragState::Dragging { active } => Some(active),
            DragState::Idle => None,
        };
        let outcome = self.board.end_drag(target, session.offset());
        match active {
            Some(active) => self.persist_outcome(active, outcome),
            None => Ok(outcome),
        }
    }

    /// Switch the board view.
    ///
    /// # Errors
    /// Returns an error when the layout cannot be persisted.
    pub fn set_view(&mut self, view: ViewMode) -> Result<()> {
        self.board.set_view(view);
        self.save_layout()
    }

    /// Return to automatic sorting.
    ///
    /// # Errors
    /// Returns an error when the layout cannot be persisted.
    pub fn reset_order(&mut self) -> Result<()> {
        self.board.reset_order();
        self.save_layout()
    }

    /// Flip completion of a task.
    ///
    /// # Errors
    /// Returns an error when the task cannot be persisted.
    pub fn toggle_done(&mut self, id: TaskId, session: &Session) -> Result<Option<Task>> {
        let Some(task) = self.board.toggle_done(id, session).cloned() else {
            return Ok(None);
        };
        tracing::info!(%id, done = task.done, "task completion toggled");
        persisted(self.store.upsert_task(&task), "store task completion")?;
        Ok(Some(task))
    }

    /// Remove every completed task.
    ///
    /// # Errors
    /// Returns an error when the deletions cannot be persisted.
    pub fn purge_completed(&mut self) -> Result<Vec<TaskId>> {
        let removed = self.board.purge_completed();
        if removed.is_empty() {
            return Ok(removed);
        }
        tracing::info!(count = removed.len(), "completed tasks purged");
        persisted(self.store.delete_tasks(&removed), "delete completed tasks")?;
        self.save_layout()?;
        Ok(removed)
    }

    /// Add a lead.
    ///
    /// # Errors
    /// Returns an error when the lead cannot be persisted.
    pub fn add_lead(&mut self, lead: Lead) -> Result<Lead> {
        tracing::info!(id = %lead.id, "lead added");
        self.leads.insert(lead.clone());
        persisted(self.store.upsert_lead(&lead), "store new lead")?;
        Ok(lead)
    }

    /// Visible leads for `query`.
    #[must_use]
    pub fn leads(&self, query: &LeadQuery, session: &Session) -> Vec<&Lead> {
        query.project(self.leads.leads(), session)
    }

    /// Change a lead's status, adding the appointment reminder task when one is booked.
    ///
    /// # Errors
    /// Returns an error when the lead or the reminder cannot be persisted.
    pub fn set_lead_status(
        &mut self,
        id: LeadId,
        status: LeadStatus,
        appointment: Option<&str>,
        session: &Session,
    ) -> Result<Option<StatusChange>> {
        let Some(change) = self.leads.set_status(id, status, appointment, session) else {
            return Ok(None);
        };
        // The reminder only spawns on entering the booked state, so it joins
        // the board before any write can fail.
        if let Some(task) = &change.follow_up {
            tracing::info!(lead = %id, task = %task.id, "appointment reminder created");
            self.board.insert(task.clone());
        }
        persisted(self.store.upsert_lead(&change.lead), "store lead status")?;
        if let Some(task) = &change.follow_up {
            persisted(self.store.upsert_task(task), "store appointment reminder")?;
            self.save_layout()?;
        }
        Ok(Some(change))
    }

    /// Replace the appointment time of a booked lead.
    ///
    /// # Errors
    /// Returns an error when the lead cannot be persisted.
    pub fn edit_appointment(&mut self, id: LeadId, raw: &str) -> Result<Option<Lead>> {
        let Some(lead) = self.leads.edit_appointment(id, raw).cloned() else {
            return Ok(None);
        };
        persisted(self.store.upsert_lead(&lead), "store appointment")?;
        Ok(Some(lead))
    }

    /// Log a conversation note on a lead.
    ///
    /// # Errors
    /// Returns an error when the lead cannot be persisted.
    pub fn add_note(
        &mut self,
        id: LeadId,
        text: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Lead>> {
        let Some(lead) = self.leads.add_conversation(id, text, now).cloned() else {
            return Ok(None);
        };
        persisted(self.store.upsert_lead(&lead), "store conversation note")?;
        Ok(Some(lead))
    }

    /// Lead statistics for a predefined window.
    #[must_use]
    pub fn analytics(&self, window: AnalyticsWindow, now: OffsetDateTime) -> LeadAnalytics {
        compute_analytics(self.leads.leads(), window, now)
    }

    /// Lead statistics for a custom `YYYY-MM-DD` range; `None` when unparsable.
    #[must_use]
    pub fn custom_analytics(
        &self,
        from: &str,
        to: Option<&str>,
        now: OffsetDateTime,
    ) -> Option<LeadAnalytics> {
        compute_custom_analytics(self.leads.leads(), from, to, now)
    }

    fn persist_outcome(&self, active: TaskId, outcome: DragOutcome) -> Result<DragOutcome> {
        match outcome {
            DragOutcome::NoOp => {}
            DragOutcome::Reordered => self.save_layout()?,
            DragOutcome::Recategorized { .. } | DragOutcome::Rescheduled { .. } => {
                if let Some(task) = self.board.get(active) {
                    persisted(self.store.upsert_task(task), "store moved task")?;
                }
            }
        }
        Ok(outcome)
    }

    fn save_layout(&self) -> Result<()> {
        persisted(self.store.save_layout(&self.board.layout()), "store board layout")
    }
}

fn loaded<T, E: Into<Error>>(result: Result<T, E>, action: &str) -> Result<T> {
    result.map_err(|err| {
        let err: Error = err.into();
        err.context(format!("failed to {action}"))
    })
}

fn persisted<T, E: Into<Error>>(result: Result<T, E>, action: &str) -> Result<T> {
    result.map_err(|err| {
        let err: Error = err.into();
        tracing::warn!(action, error = %err, "store write failed; in-memory state kept");
        err.context(format!("failed to {action}"))
    })
}
