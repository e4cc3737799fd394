//! To-do use-case service.
//!
//! # Responsibility
//! - Provide the command and read surface used by UI/FFI callers.
//! - Pair the in-memory `Session` with a `StateRepository` and a `Clock`.
//!
//! # Invariants
//! - Every successful command is followed by one `save_state` of tasks and
//!   stats together.
//! - When saving fails, in-memory state is rolled back to the pre-command
//!   checkpoint, so memory and storage never diverge.
//! - Subscribers are notified only after the save succeeds.
//! - Raw task commands (`add_task`, `update_task`, ...) keep store
//!   semantics: unknown IDs are silent no-ops.

use crate::clock::Clock;
use crate::model::draft::TaskDraft;
use crate::model::stats::UserStats;
use crate::model::task::{SubTask, SubTaskId, Task, TaskId, TaskValidationError};
use crate::repo::state_repo::{RepoError, StateRepository};
use crate::store::session::{DispatchOutcome, Session};
use crate::store::task_store::TaskCommand;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for to-do use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Input failed edge validation.
    Validation(TaskValidationError),
    /// A draft-based edit referenced a missing task.
    TaskNotFound(TaskId),
    /// A subtask edit referenced a missing subtask.
    SubTaskNotFound { task_id: TaskId, subtask_id: SubTaskId },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::TaskNotFound(task_id) => write!(f, "task not found: {task_id}"),
            Self::SubTaskNotFound {
                task_id,
                subtask_id,
            } => write!(f, "subtask not found: {subtask_id} in task {task_id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskValidationError> for ServiceError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Use-case service over one persisted session.
pub struct TodoService<R: StateRepository, C: Clock> {
    repo: R,
    clock: C,
    session: Session,
}

impl<R: StateRepository, C: Clock> TodoService<R, C> {
    /// Loads persisted state and starts a session over it.
    pub fn open(repo: R, clock: C) -> ServiceResult<Self> {
        let stored = repo.load_state()?;
        info!(
            "event=service_open module=service status=ok tasks={}",
            stored.tasks.len()
        );
        Ok(Self {
            repo,
            clock,
            session: Session::from_parts(stored.tasks, stored.stats),
        })
    }

    pub fn tasks(&self) -> &[Task] {
        self.session.tasks()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.session.task_state().task(id)
    }

    pub fn user_stats(&self) -> &UserStats {
        self.session.user_stats()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Mutable access for registering subscribers.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Creates a task from form input and returns its new ID.
    ///
    /// The ID is the creation epoch milliseconds, bumped forward while it
    /// collides with a stored task.
    pub fn create_task(&mut self, draft: TaskDraft) -> ServiceResult<TaskId> {
        let now = self.clock.now();
        let mut task = draft.into_new_task(now)?;
        task.id = self.unused_task_id(now.timestamp_millis());
        let task_id = task.id.clone();
        self.commit(TaskCommand::Add(task))?;
        Ok(task_id)
    }

    /// Re-applies form input to an existing task.
    pub fn edit_task(&mut self, id: &str, draft: TaskDraft) -> ServiceResult<()> {
        let existing = self
            .task(id)
            .ok_or_else(|| ServiceError::TaskNotFound(id.to_string()))?;
        let updated = draft.apply_to(existing, self.clock.now())?;
        self.commit(TaskCommand::Update(updated))?;
        Ok(())
    }

    pub fn add_task(&mut self, task: Task) -> ServiceResult<DispatchOutcome> {
        self.commit(TaskCommand::Add(task))
    }

    pub fn update_task(&mut self, task: Task) -> ServiceResult<DispatchOutcome> {
        self.commit(TaskCommand::Update(task))
    }

    pub fn delete_task(&mut self, id: impl Into<TaskId>) -> ServiceResult<DispatchOutcome> {
        self.commit(TaskCommand::Delete(id.into()))
    }

    pub fn toggle_task_completion(
        &mut self,
        id: impl Into<TaskId>,
    ) -> ServiceResult<DispatchOutcome> {
        self.commit(TaskCommand::ToggleCompletion(id.into()))
    }

    pub fn reorder_tasks(&mut self, tasks: Vec<Task>) -> ServiceResult<DispatchOutcome> {
        self.commit(TaskCommand::Reorder(tasks))
    }

    /// Reorders by ID list; see `TaskState::ordered_by` for gap handling.
    pub fn reorder_tasks_by_id(&mut self, ids: &[TaskId]) -> ServiceResult<DispatchOutcome> {
        let ordered = self.session.task_state().ordered_by(ids);
        self.commit(TaskCommand::Reorder(ordered))
    }

    /// Appends a new subtask and returns its generated ID.
    pub fn add_subtask(
        &mut self,
        task_id: &str,
        title: impl Into<String>,
    ) -> ServiceResult<SubTaskId> {
        if self.task(task_id).is_none() {
            return Err(ServiceError::TaskNotFound(task_id.to_string()));
        }
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ServiceError::Validation(
                TaskValidationError::EmptySubTaskTitle { subtask_id: None },
            ));
        }

        let subtask = SubTask::new(title.trim(), self.clock.now());
        let subtask_id = subtask.id.clone();
        self.commit(TaskCommand::AddSubTask {
            task_id: task_id.to_string(),
            subtask,
        })?;
        Ok(subtask_id)
    }

    pub fn toggle_subtask(
        &mut self,
        task_id: impl Into<TaskId>,
        subtask_id: impl Into<SubTaskId>,
    ) -> ServiceResult<DispatchOutcome> {
        self.commit(TaskCommand::ToggleSubTask {
            task_id: task_id.into(),
            subtask_id: subtask_id.into(),
        })
    }

    pub fn delete_subtask(
        &mut self,
        task_id: impl Into<TaskId>,
        subtask_id: impl Into<SubTaskId>,
    ) -> ServiceResult<DispatchOutcome> {
        self.commit(TaskCommand::DeleteSubTask {
            task_id: task_id.into(),
            subtask_id: subtask_id.into(),
        })
    }

    /// Reorders one task's subtasks by ID.
    ///
    /// # Errors
    /// - `TaskNotFound` for an unknown parent.
    /// - `SubTaskNotFound` when `ids` names a subtask the parent lacks.
    ///   Subtasks not named keep their relative order at the end.
    pub fn reorder_subtasks(
        &mut self,
        task_id: &str,
        ids: &[SubTaskId],
    ) -> ServiceResult<DispatchOutcome> {
        let task = self
            .task(task_id)
            .ok_or_else(|| ServiceError::TaskNotFound(task_id.to_string()))?;

        let mut remaining = task.subtasks.clone();
        let mut ordered = Vec::with_capacity(remaining.len());
        for id in ids {
            let index = remaining
                .iter()
                .position(|subtask| &subtask.id == id)
                .ok_or_else(|| ServiceError::SubTaskNotFound {
                    task_id: task_id.to_string(),
                    subtask_id: id.clone(),
                })?;
            ordered.push(remaining.remove(index));
        }
        ordered.extend(remaining);

        self.commit(TaskCommand::ReorderSubTasks {
            task_id: task_id.to_string(),
            subtasks: ordered,
        })
    }

    fn unused_task_id(&self, mut millis: i64) -> TaskId {
        loop {
            let candidate = millis.to_string();
            if self.task(&candidate).is_none() {
                return candidate;
            }
            millis = millis.saturating_add(1);
        }
    }

    fn commit(&mut self, command: TaskCommand) -> ServiceResult<DispatchOutcome> {
        let checkpoint = self.session.checkpoint();
        let command_name = command.name();
        let outcome = self.session.apply(command, self.clock.now());

        if let Err(err) = self
            .repo
            .save_state(self.session.tasks(), self.session.user_stats())
        {
            error!(
                "event=service_commit module=service status=error command={} error={}",
                command_name, err
            );
            self.session.rollback(checkpoint);
            return Err(err.into());
        }
        self.session.publish();
        Ok(outcome)
    }
}
