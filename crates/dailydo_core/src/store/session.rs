//! Command dispatch across the task and stats aggregates.
//!
//! # Responsibility
//! - Own one `TaskState` and one `UserStats` as explicit containers.
//! - Route completion events from the task reducer to the stats reducer.
//! - Run the subtask auto-completion reaction through the same dispatch path.
//! - Publish committed state to subscribers.
//!
//! # Invariants
//! - Commands run to completion one at a time; follow-up commands queued by
//!   reactions run before `apply` returns.
//! - Exactly one stats completion is recorded per `TaskEvent::Completed`.
//! - `revision` increases by one per applied top-level command; a rollback
//!   restores it.
//! - Subscribers only see published state, and published revisions strictly
//!   increase. Persisting callers use `apply`, then `publish` after the
//!   commit succeeds.

use crate::model::stats::UserStats;
use crate::model::task::{Task, TaskId};
use crate::store::stats_store::record_completion;
use crate::store::task_store::{TaskCommand, TaskEvent, TaskState};
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};

/// Callback invoked after each committed command.
pub type Listener = Box<dyn FnMut(u64, &TaskState, &UserStats)>;

/// Summary of one dispatched command, including reactions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Stats completions recorded during this dispatch.
    pub completions: u32,
    /// Parent tasks completed because their last subtask was completed.
    pub auto_completed: Vec<TaskId>,
    pub revision: u64,
}

/// Saved aggregate state used to roll back a failed commit.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    tasks: TaskState,
    stats: UserStats,
    revision: u64,
}

#[derive(Default)]
pub struct Session {
    tasks: TaskState,
    stats: UserStats,
    revision: u64,
    listeners: Vec<Listener>,
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("tasks", &self.tasks.len())
            .field("revision", &self.revision)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session from previously loaded aggregates.
    pub fn from_parts(tasks: Vec<Task>, stats: UserStats) -> Self {
        Self {
            tasks: TaskState::from_tasks(tasks),
            stats,
            ..Self::default()
        }
    }

    pub fn tasks(&self) -> &[Task] {
        self.tasks.tasks()
    }

    pub fn task_state(&self) -> &TaskState {
        &self.tasks
    }

    pub fn user_stats(&self) -> &UserStats {
        &self.stats
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Registers a listener called after every committed command.
    pub fn subscribe(&mut self, listener: impl FnMut(u64, &TaskState, &UserStats) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            tasks: self.tasks.clone(),
            stats: self.stats.clone(),
            revision: self.revision,
        }
    }

    /// Restores aggregates captured by `checkpoint`. Listeners are kept.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.tasks = checkpoint.tasks;
        self.stats = checkpoint.stats;
        self.revision = checkpoint.revision;
    }

    /// Applies one command and publishes the result.
    pub fn dispatch(&mut self, command: TaskCommand, now: DateTime<Utc>) -> DispatchOutcome {
        let outcome = self.apply(command, now);
        self.publish();
        outcome
    }

    /// Applies one command plus any reactions it triggers, without notifying
    /// subscribers.
    pub fn apply(&mut self, command: TaskCommand, now: DateTime<Utc>) -> DispatchOutcome {
        let command_name = command.name();
        let mut outcome = DispatchOutcome::default();
        let mut queue = VecDeque::from([command]);

        while let Some(next) = queue.pop_front() {
            let events = self.tasks.apply(next, now);
            for event in events {
                match event {
                    TaskEvent::Completed { .. } => {
                        self.stats = record_completion(std::mem::take(&mut self.stats), now);
                        outcome.completions += 1;
                    }
                    TaskEvent::SubTaskToggled {
                        task_id,
                        completed: true,
                        ..
                    }
                    | TaskEvent::SubTaskDeleted { task_id, .. } => {
                        if self.parent_ready_for_auto_completion(&task_id) {
                            debug!("event=task_auto_complete module=store status=queued");
                            outcome.auto_completed.push(task_id.clone());
                            queue.push_back(TaskCommand::ToggleCompletion(task_id));
                        }
                    }
                    TaskEvent::SubTaskToggled { .. } | TaskEvent::Reopened { .. } => {}
                }
            }
        }

        self.revision += 1;
        outcome.revision = self.revision;
        info!(
            "event=dispatch module=store status=ok command={} completions={} auto_completed={} revision={}",
            command_name,
            outcome.completions,
            outcome.auto_completed.len(),
            self.revision
        );
        outcome
    }

    /// Notifies subscribers of the current state and revision.
    pub fn publish(&mut self) {
        for listener in &mut self.listeners {
            listener(self.revision, &self.tasks, &self.stats);
        }
    }

    /// Consumes the session, returning its aggregates.
    pub fn into_parts(self) -> (Vec<Task>, UserStats) {
        (self.tasks.into_tasks(), self.stats)
    }

    fn parent_ready_for_auto_completion(&self, task_id: &str) -> bool {
        self.tasks
            .task(task_id)
            .is_some_and(|task| !task.is_completed && task.all_subtasks_completed())
    }
}
