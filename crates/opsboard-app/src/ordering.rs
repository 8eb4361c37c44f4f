//! Board state and drag reconciliation.
//!
//! [`TaskBoard`] owns the in-memory task collection between store snapshots.
//! A drag gesture ends in exactly one of: nothing, a reorder, a category
//! change or a reschedule. Unknown identifiers never fail; they are logged and
//! the board stays untouched.

use std::collections::{HashMap, HashSet};

use opsboard_core::calendar::{NOON, at_local};
use opsboard_core::{Category, Session, Task, TaskId};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, UtcOffset};

/// Whether the default comparator or the manual sequence decides the order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Open tasks first, then by due date.
    #[default]
    Auto,
    /// The user-established sequence.
    Manual,
}

/// How the board is laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// A single list.
    #[default]
    List,
    /// One column per category (kanban).
    Grouped,
}

/// Drag gesture state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DragState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// A task is being dragged.
    Dragging {
        /// Task picked up at gesture start.
        active: TaskId,
    },
}

/// Where a drag gesture ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// Dropped onto another task card.
    Task(TaskId),
    /// Dropped onto a column header or empty column area.
    Column(String),
    /// Dropped onto a calendar day.
    CalendarDay(Date),
}

/// The single mutation a gesture produced.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    /// Nothing changed.
    NoOp,
    /// The manual sequence changed.
    Reordered,
    /// The task moved to another column.
    Recategorized {
        /// Previous category.
        from: Category,
        /// New category.
        to: Category,
    },
    /// The due date moved to another day.
    Rescheduled {
        /// New due timestamp.
        due: OffsetDateTime,
    },
}

impl DragOutcome {
    /// Whether the collection changed.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Self::NoOp)
    }
}

/// Persistable part of the board that is not stored on the tasks themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardLayout {
    /// Manual placement sequence.
    #[serde(default)]
    pub order: Vec<TaskId>,
    /// Manual-order flag.
    #[serde(default)]
    pub sort_mode: SortMode,
    /// Current view.
    #[serde(default)]
    pub view: ViewMode,
}

/// Task collection plus manual order, view and drag state.
#[derive(Debug, Clone, Default)]
pub struct TaskBoard {
    tasks: Vec<Task>,
    task_index: HashMap<TaskId, usize>,
    order: Vec<TaskId>,
    sort_mode: SortMode,
    view: ViewMode,
    drag: DragState,
}

impl TaskBoard {
    /// Board over `tasks`; the manual sequence starts as collection order.
    #[must_use]
    pub fn new(tasks: Vec<Task>) -> Self {
        Self::with_layout(tasks, BoardLayout::default())
    }

    /// Board over `tasks` restoring a saved layout.
    #[must_use]
    pub fn with_layout(tasks: Vec<Task>, layout: BoardLayout) -> Self {
        let mut board = Self {
            tasks: Vec::new(),
            task_index: HashMap::new(),
            order: layout.order,
            sort_mode: layout.sort_mode,
            view: ViewMode::List,
            drag: DragState::Idle,
        };
        board.replace_snapshot(tasks);
        board.set_view(layout.view);
        board
    }

    /// Tasks in collection order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Tasks in manual sequence order.
    #[must_use]
    pub fn ordered(&self) -> Vec<&Task> {
        self.order.iter().filter_map(|id| self.get(*id)).collect()
    }

    /// Look up a task.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.task_index.get(&id).and_then(|&idx| self.tasks.get(idx))
    }

    fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        let idx = *self.task_index.get(&id)?;
        self.tasks.get_mut(idx)
    }

    /// Snapshot of the layout for persistence.
    #[must_use]
    pub fn layout(&self) -> BoardLayout {
        BoardLayout {
            order: self.order.clone(),
            sort_mode: self.sort_mode,
            view: self.view,
        }
    }

    /// Stored manual-order flag.
    #[must_use]
    pub const fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    /// Mode the filter pipeline should use; grouped view always sorts automatically.
    #[must_use]
    pub const fn effective_sort(&self) -> SortMode {
        match self.view {
            ViewMode::Grouped => SortMode::Auto,
            ViewMode::List => self.sort_mode,
        }
    }

    /// Current view.
    #[must_use]
    pub const fn view(&self) -> ViewMode {
        self.view
    }

    /// Current drag state.
    #[must_use]
    pub const fn drag_state(&self) -> DragState {
        self.drag
    }

    /// Switch view; entering the grouped view clears the manual-order flag.
    pub fn set_view(&mut self, view: ViewMode) {
        self.view = view;
        if view == ViewMode::Grouped {
            self.sort_mode = SortMode::Auto;
        }
    }

    /// Return to automatic sorting.
    pub fn reset_order(&mut self) {
        self.sort_mode = SortMode::Auto;
    }

    /// Gesture start. Returns `false` (and stays idle) for unknown tasks.
    pub fn begin_drag(&mut self, active: TaskId) -> bool {
        if self.get(active).is_none() {
            tracing::warn!(%active, "drag started on unknown task");
            self.drag = DragState::Idle;
            return false;
        }
        self.drag = DragState::Dragging { active };
        true
    }

    /// Abandon the current gesture.
    pub fn cancel_drag(&mut self) {
        self.drag = DragState::Idle;
    }

    /// Gesture end. `None` means the task was released outside any drop target.
    pub fn end_drag(&mut self, target: Option<DropTarget>, offset: UtcOffset) -> DragOutcome {
        let DragState::Dragging { active } = std::mem::take(&mut self.drag) else {
            tracing::debug!("drop received without an active drag");
            return DragOutcome::NoOp;
        };

        match target {
            None => {
                tracing::debug!(%active, "drag cancelled outside any drop target");
                DragOutcome::NoOp
            }
            Some(DropTarget::Task(over)) => {
                let (Some(dragged), Some(target)) = (self.get(active), self.get(over)) else {
                    tracing::warn!(%active, %over, "drop onto unknown task ignored");
                    return DragOutcome::NoOp;
                };
                if self.view == ViewMode::Grouped && dragged.category != target.category {
                    let destination = target.category;
                    self.recategorize(active, destination.as_str())
                } else {
                    self.reorder(active, over)
                }
            }
            Some(DropTarget::Column(destination)) => self.recategorize(active, &destination),
            Some(DropTarget::CalendarDay(date)) => self.schedule_on_calendar(active, date, offset),
        }
    }

    /// Move `active` to the position held by `over` in the manual sequence.
    pub fn reorder(&mut self, active: TaskId, over: TaskId) -> DragOutcome {
        if active == over {
            return DragOutcome::NoOp;
        }
        let from = self.order.iter().position(|id| *id == active);
        let to = self.order.iter().position(|id| *id == over);
        let (Some(from), Some(to)) = (from, to) else {
            tracing::warn!(%active, %over, "reorder skipped: task not on board");
            return DragOutcome::NoOp;
        };

        let moved = self.order.remove(from);
        self.order.insert(to, moved);
        if self.view == ViewMode::List {
            self.sort_mode = SortMode::Manual;
        }
        DragOutcome::Reordered
    }

    /// Move `active` to the column named by `destination`.
    pub fn recategorize(&mut self, active: TaskId, destination: &str) -> DragOutcome {
        let to = match destination.parse::<Category>() {
            Ok(category) => category,
            Err(err) => {
                tracing::warn!(%active, %err, "recategorize rejected");
                return DragOutcome::NoOp;
            }
        };
        let Some(task) = self.get_mut(active) else {
            tracing::warn!(%active, "recategorize skipped: task not on board");
            return DragOutcome::NoOp;
        };
        let from = task.category;
        if from == to {
            return DragOutcome::NoOp;
        }
        task.category = to;
        DragOutcome::Recategorized { from, to }
    }

    /// Move the due date to the local day `date`, keeping its local time of
    /// day or using local noon.
    pub fn schedule_on_calendar(
        &mut self,
        active: TaskId,
        date: Date,
        offset: UtcOffset,
    ) -> DragOutcome {
        let Some(task) = self.get_mut(active) else {
            tracing::warn!(%active, "schedule skipped: task not on board");
            return DragOutcome::NoOp;
        };
        // Stored due dates may carry any offset; the drop day is local.
        let due = task.due().map_or_else(
            || at_local(date, NOON, offset),
            |current| current.to_offset(offset).replace_date(date),
        );
        match task.set_due(due) {
            Ok(()) => DragOutcome::Rescheduled { due },
            Err(err) => {
                tracing::warn!(%active, %err, "schedule skipped: due date not representable");
                DragOutcome::NoOp
            }
        }
    }

    /// Append a task at the end of the collection and the manual sequence.
    pub fn insert(&mut self, task: Task) {
        if let Some(existing) = self.get_mut(task.id) {
            *existing = task;
            return;
        }
        self.order.push(task.id);
        self.task_index.insert(task.id, self.tasks.len());
        self.tasks.push(task);
    }

    /// Apply an edit to a task. Returns the edited task, or `None` when unknown.
    pub fn edit(&mut self, id: TaskId, apply: impl FnOnce(&mut Task)) -> Option<&Task> {
        let Some(task) = self.get_mut(id) else {
            tracing::warn!(%id, "edit skipped: task not on board");
            return None;
        };
        apply(task);
        Some(&*task)
    }

    /// Flip completion, stamping or clearing completedBy/completedAt together.
    pub fn toggle_done(&mut self, id: TaskId, session: &Session) -> Option<&Task> {
        self.edit(id, |task| {
            if task.done {
                task.reopen();
            } else {
                task.complete(session.user.assignee_key(), session.now);
            }
        })
    }

    /// Remove every completed task. Returns the removed ids.
    pub fn purge_completed(&mut self) -> Vec<TaskId> {
        let removed: Vec<TaskId> = self
            .tasks
            .iter()
            .filter(|task| task.done)
            .map(|task| task.id)
            .collect();
        if removed.is_empty() {
            return removed;
        }
        let remaining = self.tasks.drain(..).filter(|task| !task.done).collect();
        self.replace_snapshot(remaining);
        removed
    }

    /// Replace the whole collection with a store snapshot.
    ///
    /// The manual sequence keeps surviving ids in place and appends new ones
    /// in collection order.
    pub fn replace_snapshot(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.rebuild_index();

        let mut seen = HashSet::new();
        let present = &self.task_index;
        self.order.retain(|id| present.contains_key(id) && seen.insert(*id));
        for task in &self.tasks {
            if seen.insert(task.id) {
                self.order.push(task.id);
            }
        }

        if let DragState::Dragging { active } = self.drag
            && !self.task_index.contains_key(&active)
        {
            tracing::debug!(%active, "dragged task vanished in snapshot; gesture dropped");
            self.drag = DragState::Idle;
        }
    }

    fn rebuild_index(&mut self) {
        self.task_index.clear();
        for (idx, task) in self.tasks.iter().enumerate() {
            self.task_index.insert(task.id, idx);
        }
    }
}
