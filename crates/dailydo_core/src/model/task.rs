//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical in-memory task/subtask shape used by reducers.
//! - Provide timestamp and subtask helpers shared by the store and engine.
//! - Validate tasks at input and persistence edges.
//!
//! # Invariants
//! - `created_at` is never rewritten after construction.
//! - `updated_at` never moves backwards; `touch` clamps to the newest instant.
//! - `recurrence` is `Some` only when its kind is not `RecurrenceType::None`.
//!
//! # See also
//! - model::persisted for the string-dated storage shape.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable task identifier, usually derived from creation epoch milliseconds.
pub type TaskId = String;

/// Subtask identifier, unique within its parent task.
pub type SubTaskId = String;

/// Digits kept when timestamps are normalized to persisted precision.
const PERSISTED_SUBSEC_DIGITS: u16 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            "URGENT" => Some(Self::Urgent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Work,
    Personal,
    Health,
    Shopping,
    #[default]
    Other,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "WORK",
            Self::Personal => "PERSONAL",
            Self::Health => "HEALTH",
            Self::Shopping => "SHOPPING",
            Self::Other => "OTHER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "WORK" => Some(Self::Work),
            "PERSONAL" => Some(Self::Personal),
            "HEALTH" => Some(Self::Health),
            "SHOPPING" => Some(Self::Shopping),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Repeat cadence of a recurring task.
///
/// `None` exists for input/persisted shapes only; an in-memory task with
/// `None` cadence carries no `RecurrenceInfo` at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrenceType {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl RecurrenceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "NONE" => Some(Self::None),
            "DAILY" => Some(Self::Daily),
            "WEEKLY" => Some(Self::Weekly),
            "MONTHLY" => Some(Self::Monthly),
            _ => None,
        }
    }

    pub fn is_recurring(self) -> bool {
        self != Self::None
    }
}

/// Recurrence bookkeeping owned by one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceInfo {
    pub kind: RecurrenceType,
    /// Consecutive on-time completions.
    pub streak: u32,
    /// Last time the owning task was marked complete.
    pub last_completed_date: Option<DateTime<Utc>>,
    /// Mirror of the task due date after the last recompute.
    pub next_due_date: Option<DateTime<Utc>>,
}

impl RecurrenceInfo {
    /// Creates fresh recurrence state with a zero streak.
    pub fn new(kind: RecurrenceType, next_due_date: Option<DateTime<Utc>>) -> Self {
        Self {
            kind,
            streak: 0,
            last_completed_date: None,
            next_due_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubTask {
    pub id: SubTaskId,
    pub title: String,
    pub is_completed: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubTask {
    /// Creates an incomplete subtask with a generated ID.
    pub fn new(title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), title, now)
    }

    /// Creates an incomplete subtask with a caller-provided ID.
    pub fn with_id(id: impl Into<SubTaskId>, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            is_completed: false,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets completion flag and stamps `updated_at`.
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        self.is_completed = completed;
        self.touch(now);
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    fn normalize_timestamps(&mut self) {
        self.due_date = self.due_date.map(normalize_instant);
        self.created_at = normalize_instant(self.created_at);
        self.updated_at = normalize_instant(self.updated_at);
    }
}

/// Canonical task record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub category: Category,
    pub is_completed: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub recurrence: Option<RecurrenceInfo>,
    /// Ordered; position is user-controlled via reorder.
    pub subtasks: Vec<SubTask>,
}

impl Task {
    /// Creates an incomplete, non-recurring task with default priority and
    /// category.
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            priority: Priority::default(),
            category: Category::default(),
            is_completed: false,
            due_date: None,
            created_at: now,
            updated_at: now,
            recurrence: None,
            subtasks: Vec::new(),
        }
    }

    /// Returns whether this task regenerates after completion.
    pub fn is_recurring(&self) -> bool {
        self.recurrence
            .as_ref()
            .is_some_and(|recurrence| recurrence.kind.is_recurring())
    }

    /// Advances `updated_at` to `now` unless it is already newer.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    pub fn subtask(&self, id: &str) -> Option<&SubTask> {
        self.subtasks.iter().find(|subtask| subtask.id == id)
    }

    pub fn subtask_mut(&mut self, id: &str) -> Option<&mut SubTask> {
        self.subtasks.iter_mut().find(|subtask| subtask.id == id)
    }

    /// Marks every subtask as completed.
    pub fn complete_all_subtasks(&mut self, now: DateTime<Utc>) {
        for subtask in &mut self.subtasks {
            subtask.set_completed(true, now);
        }
    }

    /// Marks every subtask as not completed.
    pub fn reset_subtasks(&mut self, now: DateTime<Utc>) {
        for subtask in &mut self.subtasks {
            subtask.set_completed(false, now);
        }
    }

    /// Returns `(completed, total)` subtask counts.
    pub fn subtask_progress(&self) -> (usize, usize) {
        let done = self
            .subtasks
            .iter()
            .filter(|subtask| subtask.is_completed)
            .count();
        (done, self.subtasks.len())
    }

    /// True when the task has subtasks and all of them are completed.
    pub fn all_subtasks_completed(&self) -> bool {
        !self.subtasks.is_empty() && self.subtasks.iter().all(|subtask| subtask.is_completed)
    }

    /// Truncates every instant to millisecond precision, the precision kept
    /// by ISO-8601 persisted strings.
    pub fn normalize_timestamps(&mut self) {
        self.due_date = self.due_date.map(normalize_instant);
        self.created_at = normalize_instant(self.created_at);
        self.updated_at = normalize_instant(self.updated_at);
        if let Some(recurrence) = self.recurrence.as_mut() {
            recurrence.last_completed_date = recurrence.last_completed_date.map(normalize_instant);
            recurrence.next_due_date = recurrence.next_due_date.map(normalize_instant);
        }
        for subtask in &mut self.subtasks {
            subtask.normalize_timestamps();
        }
    }

    /// Validates edge-level invariants.
    ///
    /// Reducers never call this; input builders and the persistence
    /// repository do.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }
        if self.updated_at < self.created_at {
            return Err(TaskValidationError::UpdatedBeforeCreated {
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }
        if let Some(recurrence) = &self.recurrence {
            if !recurrence.kind.is_recurring() {
                return Err(TaskValidationError::RecurrenceWithoutType);
            }
        }

        let mut seen = HashSet::with_capacity(self.subtasks.len());
        for subtask in &self.subtasks {
            if subtask.title.trim().is_empty() {
                return Err(TaskValidationError::EmptySubTaskTitle {
                    subtask_id: Some(subtask.id.clone()),
                });
            }
            if !seen.insert(subtask.id.as_str()) {
                return Err(TaskValidationError::DuplicateSubTaskId {
                    subtask_id: subtask.id.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Truncates an instant to millisecond precision.
pub fn normalize_instant(value: DateTime<Utc>) -> DateTime<Utc> {
    value.trunc_subsecs(PERSISTED_SUBSEC_DIGITS)
}

/// Derives a task ID from the creation instant (epoch milliseconds).
pub fn generate_task_id(now: DateTime<Utc>) -> TaskId {
    now.timestamp_millis().to_string()
}

/// Validation failures reported by input builders and persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyTitle,
    UpdatedBeforeCreated {
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    },
    RecurrenceWithoutType,
    /// `subtask_id` is `None` when the title was rejected before an ID was
    /// assigned.
    EmptySubTaskTitle {
        subtask_id: Option<SubTaskId>,
    },
    DuplicateSubTaskId {
        subtask_id: SubTaskId,
    },
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "task title cannot be empty"),
            Self::UpdatedBeforeCreated {
                created_at,
                updated_at,
            } => write!(
                f,
                "updated_at ({updated_at}) must be >= created_at ({created_at})"
            ),
            Self::RecurrenceWithoutType => {
                write!(f, "recurrence info requires a type other than NONE")
            }
            Self::EmptySubTaskTitle {
                subtask_id: Some(subtask_id),
            } => write!(f, "subtask `{subtask_id}` title cannot be empty"),
            Self::EmptySubTaskTitle { subtask_id: None } => {
                write!(f, "subtask title cannot be empty")
            }
            Self::DuplicateSubTaskId { subtask_id } => {
                write!(f, "duplicate subtask id `{subtask_id}`")
            }
        }
    }
}

impl Error for TaskValidationError {}
