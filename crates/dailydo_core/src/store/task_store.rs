//! Task collection state and its command reducer.
//!
//! # Responsibility
//! - Own the ordered task collection.
//! - Apply mutation commands and report completion events.
//! - Delegate recurring rollover to `engine::recurrence`.
//!
//! # Invariants
//! - Unknown task/subtask IDs make a command a no-op.
//! - Completing a task force-completes all of its subtasks.
//! - Only the Incomplete -> Completed transition emits `TaskEvent::Completed`.
//! - Reopening a task is a pure flag flip.
//! - `update` keeps the stored `created_at` and never rewinds `updated_at`.

use crate::engine::recurrence;
use crate::model::task::{SubTask, SubTaskId, Task, TaskId};
use chrono::{DateTime, Utc};
use log::debug;

/// Mutation commands accepted by the task reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskCommand {
    Add(Task),
    Update(Task),
    Delete(TaskId),
    ToggleCompletion(TaskId),
    Reorder(Vec<Task>),
    AddSubTask {
        task_id: TaskId,
        subtask: SubTask,
    },
    ToggleSubTask {
        task_id: TaskId,
        subtask_id: SubTaskId,
    },
    DeleteSubTask {
        task_id: TaskId,
        subtask_id: SubTaskId,
    },
    ReorderSubTasks {
        task_id: TaskId,
        subtasks: Vec<SubTask>,
    },
}

impl TaskCommand {
    /// Stable name used in log events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add(_) => "task_add",
            Self::Update(_) => "task_update",
            Self::Delete(_) => "task_delete",
            Self::ToggleCompletion(_) => "task_toggle",
            Self::Reorder(_) => "task_reorder",
            Self::AddSubTask { .. } => "subtask_add",
            Self::ToggleSubTask { .. } => "subtask_toggle",
            Self::DeleteSubTask { .. } => "subtask_delete",
            Self::ReorderSubTasks { .. } => "subtask_reorder",
        }
    }
}

/// Facts produced by a reducer step, consumed by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// A task went Incomplete -> Completed. Recurring tasks are already
    /// rolled over when this is emitted.
    Completed { task_id: TaskId, recurring: bool },
    Reopened { task_id: TaskId },
    SubTaskToggled {
        task_id: TaskId,
        subtask_id: SubTaskId,
        completed: bool,
    },
    SubTaskDeleted {
        task_id: TaskId,
        subtask_id: SubTaskId,
    },
}

/// Ordered task collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskState {
    tasks: Vec<Task>,
}

impl TaskState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    /// Ordered read view.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn pending_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|task| !task.is_completed)
    }

    pub fn completed_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|task| task.is_completed)
    }

    /// Incomplete tasks due on an earlier calendar day than `now`.
    pub fn overdue_tasks(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Task> {
        let today = now.date_naive();
        self.tasks.iter().filter(move |task| {
            !task.is_completed
                && task
                    .due_date
                    .is_some_and(|due_date| due_date.date_naive() < today)
        })
    }

    /// Returns tasks arranged by `ids`.
    ///
    /// Unknown IDs are skipped; tasks not mentioned keep their relative order
    /// after the listed ones, so reordering never drops a task.
    pub fn ordered_by(&self, ids: &[TaskId]) -> Vec<Task> {
        let mut remaining: Vec<Option<Task>> = self.tasks.iter().cloned().map(Some).collect();
        let mut ordered = Vec::with_capacity(self.tasks.len());
        for id in ids {
            let slot = remaining
                .iter_mut()
                .find(|slot| slot.as_ref().is_some_and(|task| &task.id == id));
            if let Some(task) = slot.and_then(Option::take) {
                ordered.push(task);
            }
        }
        ordered.extend(remaining.into_iter().flatten());
        ordered
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    /// Applies one command in place and returns produced events.
    pub fn apply(&mut self, command: TaskCommand, now: DateTime<Utc>) -> Vec<TaskEvent> {
        match command {
            TaskCommand::Add(task) => {
                self.tasks.push(task);
                Vec::new()
            }
            TaskCommand::Update(task) => {
                self.update(task);
                Vec::new()
            }
            TaskCommand::Delete(id) => {
                self.tasks.retain(|task| task.id != id);
                Vec::new()
            }
            TaskCommand::ToggleCompletion(id) => self.toggle_completion(&id, now),
            TaskCommand::Reorder(mut tasks) => {
                for task in &mut tasks {
                    task.normalize_timestamps();
                }
                self.tasks = tasks;
                Vec::new()
            }
            TaskCommand::AddSubTask { task_id, subtask } => {
                if let Some(task) = self.task_mut(&task_id) {
                    task.subtasks.push(subtask);
                    task.touch(now);
                }
                Vec::new()
            }
            TaskCommand::ToggleSubTask {
                task_id,
                subtask_id,
            } => self.toggle_subtask(task_id, subtask_id, now),
            TaskCommand::DeleteSubTask {
                task_id,
                subtask_id,
            } => self.delete_subtask(task_id, subtask_id, now),
            TaskCommand::ReorderSubTasks { task_id, subtasks } => {
                if let Some(task) = self.task_mut(&task_id) {
                    task.subtasks = subtasks;
                    task.touch(now);
                }
                Vec::new()
            }
        }
    }

    fn update(&mut self, mut task: Task) {
        let Some(index) = self.position(&task.id) else {
            debug!("event=task_update module=store status=skipped reason=not_found");
            return;
        };
        let existing = &self.tasks[index];
        task.created_at = existing.created_at;
        if task.updated_at < existing.updated_at {
            task.updated_at = existing.updated_at;
        }
        self.tasks[index] = task;
    }

    fn toggle_completion(&mut self, id: &str, now: DateTime<Utc>) -> Vec<TaskEvent> {
        let Some(index) = self.position(id) else {
            debug!("event=task_toggle module=store status=skipped reason=not_found");
            return Vec::new();
        };

        let task = &mut self.tasks[index];
        if task.is_completed {
            task.is_completed = false;
            task.touch(now);
            return vec![TaskEvent::Reopened {
                task_id: task.id.clone(),
            }];
        }

        task.is_completed = true;
        task.touch(now);
        task.complete_all_subtasks(now);

        let recurring = task.is_recurring();
        if recurring {
            if let Some(info) = task.recurrence.as_mut() {
                info.last_completed_date = Some(now);
            }
            *task = recurrence::advance(task.clone(), now);
        }

        vec![TaskEvent::Completed {
            task_id: task.id.clone(),
            recurring,
        }]
    }

    fn toggle_subtask(
        &mut self,
        task_id: TaskId,
        subtask_id: SubTaskId,
        now: DateTime<Utc>,
    ) -> Vec<TaskEvent> {
        let Some(task) = self.task_mut(&task_id) else {
            return Vec::new();
        };
        let Some(subtask) = task.subtask_mut(&subtask_id) else {
            return Vec::new();
        };

        let completed = !subtask.is_completed;
        subtask.set_completed(completed, now);
        task.touch(now);
        vec![TaskEvent::SubTaskToggled {
            task_id,
            subtask_id,
            completed,
        }]
    }

    fn delete_subtask(
        &mut self,
        task_id: TaskId,
        subtask_id: SubTaskId,
        now: DateTime<Utc>,
    ) -> Vec<TaskEvent> {
        let Some(task) = self.task_mut(&task_id) else {
            return Vec::new();
        };
        let before = task.subtasks.len();
        task.subtasks.retain(|subtask| subtask.id != subtask_id);
        if task.subtasks.len() == before {
            return Vec::new();
        }
        task.touch(now);
        vec![TaskEvent::SubTaskDeleted {
            task_id,
            subtask_id,
        }]
    }
}

/// Pure reducer form: consumes the state and returns the next state.
pub fn reduce(
    mut state: TaskState,
    command: TaskCommand,
    now: DateTime<Utc>,
) -> (TaskState, Vec<TaskEvent>) {
    let events = state.apply(command, now);
    (state, events)
}
