//! Task input draft.
//!
//! # Responsibility
//! - Turn form-level input into a validated `Task` for create and edit flows.
//!
//! # Invariants
//! - Titles and descriptions are trimmed; an empty description becomes `None`.
//! - A draft with `RecurrenceType::None` yields a task without recurrence.
//! - Editing keeps identity, creation time, completion flag, subtasks and
//!   accumulated streak of the existing task.

use crate::model::task::{
    generate_task_id, Category, Priority, RecurrenceInfo, RecurrenceType, Task,
    TaskValidationError,
};
use chrono::{DateTime, Utc};

/// User-entered task fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub category: Category,
    pub due_date: Option<DateTime<Utc>>,
    pub recurrence: RecurrenceType,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Builds a brand-new task whose ID derives from `now`.
    ///
    /// # Errors
    /// - Returns `TaskValidationError::EmptyTitle` for blank titles.
    pub fn into_new_task(self, now: DateTime<Utc>) -> Result<Task, TaskValidationError> {
        let mut task = Task::new(generate_task_id(now), self.title.trim(), now);
        task.description = normalize_description(self.description);
        task.priority = self.priority;
        task.category = self.category;
        task.due_date = self.due_date;
        task.recurrence = self
            .recurrence
            .is_recurring()
            .then(|| RecurrenceInfo::new(self.recurrence, self.due_date));
        task.validate()?;
        Ok(task)
    }

    /// Applies this draft to an existing task, producing its replacement.
    ///
    /// Switching cadence keeps the streak and last completion; switching to
    /// `RecurrenceType::None` drops recurrence entirely.
    pub fn apply_to(self, existing: &Task, now: DateTime<Utc>) -> Result<Task, TaskValidationError> {
        let mut task = existing.clone();
        task.title = self.title.trim().to_string();
        task.description = normalize_description(self.description);
        task.priority = self.priority;
        task.category = self.category;
        task.due_date = self.due_date;
        task.recurrence = if self.recurrence.is_recurring() {
            let previous = existing.recurrence.as_ref();
            Some(RecurrenceInfo {
                kind: self.recurrence,
                streak: previous.map_or(0, |info| info.streak),
                last_completed_date: previous.and_then(|info| info.last_completed_date),
                next_due_date: self.due_date,
            })
        } else {
            None
        };
        task.touch(now);
        task.validate()?;
        Ok(task)
    }
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
