//! Persistence seam for the dashboard.
//!
//! The store is the system of record. The service writes through on every
//! mutation and replaces its in-memory collections wholesale on sync.

use anyhow::Error;
use opsboard_core::{Lead, Task, TaskId};

use crate::ordering::BoardLayout;

/// Minimal storage abstraction required by [`DashboardService`](crate::service::DashboardService).
pub trait RecordStore {
    /// Error type bubbled up from the backing store.
    type Error: Into<Error>;

    /// Load every task.
    ///
    /// # Errors
    /// Returns a store-specific error when the collection cannot be read.
    fn load_tasks(&self) -> Result<Vec<Task>, Self::Error>;

    /// Load every lead.
    ///
    /// # Errors
    /// Returns a store-specific error when the collection cannot be read.
    fn load_leads(&self) -> Result<Vec<Lead>, Self::Error>;

    /// Create or replace a task keyed by id.
    ///
    /// # Errors
    /// Returns a store-specific error when persisting fails.
    fn upsert_task(&self, task: &Task) -> Result<(), Self::Error>;

    /// Delete a task by id. Deleting an unknown id is not an error.
    ///
    /// # Errors
    /// Returns a store-specific error when persisting fails.
    fn delete_task(&self, id: TaskId) -> Result<(), Self::Error>;

    /// Delete several tasks.
    ///
    /// The default implementation calls [`delete_task`](Self::delete_task)
    /// for each id and stops at the first failure.
    ///
    /// # Errors
    /// Propagates the first error from the underlying store.
    fn delete_tasks(&self, ids: &[TaskId]) -> Result<(), Self::Error> {
        ids.iter().try_for_each(|id| self.delete_task(*id))
    }

    /// Create or replace a lead keyed by id.
    ///
    /// # Errors
    /// Returns a store-specific error when persisting fails.
    fn upsert_lead(&self, lead: &Lead) -> Result<(), Self::Error>;

    /// Load the saved board layout; stores without one return the default.
    ///
    /// # Errors
    /// Returns a store-specific error when the layout cannot be read.
    fn load_layout(&self) -> Result<BoardLayout, Self::Error>;

    /// Persist the board layout.
    ///
    /// # Errors
    /// Returns a store-specific error when persisting fails.
    fn save_layout(&self, layout: &BoardLayout) -> Result<(), Self::Error>;
}
