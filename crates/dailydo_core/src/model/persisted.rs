//! Persisted (string-dated) shapes and the conversion boundary.
//!
//! # Responsibility
//! - Define the storage/wire layout: camelCase keys, ISO-8601 date strings.
//! - Convert between persisted shapes and canonical in-memory models.
//!
//! # Invariants
//! - Business logic never sees these types; conversion happens at the edge.
//! - Instants are written as UTC with millisecond precision (`...T..:..:..sssZ`).
//! - Calendar days are written as `YYYY-MM-DD`.
//! - A persisted recurrence with type `NONE` reads back as no recurrence.

use crate::model::stats::UserStats;
use crate::model::task::{
    Category, Priority, RecurrenceInfo, RecurrenceType, SubTask, Task, TaskId,
};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

const DAY_FORMAT: &str = "%Y-%m-%d";

pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while decoding persisted data.
#[derive(Debug)]
pub enum CodecError {
    InvalidInstant { field: &'static str, value: String },
    InvalidDay { field: &'static str, value: String },
    Json(serde_json::Error),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInstant { field, value } => {
                write!(f, "invalid ISO-8601 instant `{value}` in `{field}`")
            }
            Self::InvalidDay { field, value } => {
                write!(f, "invalid calendar day `{value}` in `{field}`")
            }
            Self::Json(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecurrence {
    #[serde(rename = "type")]
    pub kind: RecurrenceType,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub last_completed_date: Option<String>,
    #[serde(default)]
    pub next_due_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSubTask {
    pub id: String,
    pub title: String,
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedTask {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub priority: Priority,
    pub category: Category,
    pub is_completed: bool,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<PersistedRecurrence>,
    #[serde(default)]
    pub subtasks: Vec<PersistedSubTask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedStats {
    pub total_tasks_completed: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_completion_date: Option<String>,
    #[serde(default)]
    pub weekly_completions: BTreeMap<String, u32>,
    #[serde(default)]
    pub monthly_completions: BTreeMap<String, u32>,
}

/// Full application snapshot as stored by the external persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub tasks: Vec<PersistedTask>,
    #[serde(default)]
    pub user_stats: PersistedStats,
}

impl PersistedState {
    /// Captures tasks and stats in persisted form.
    pub fn from_parts(tasks: &[Task], stats: &UserStats) -> Self {
        Self {
            tasks: tasks.iter().map(PersistedTask::from).collect(),
            user_stats: PersistedStats::from(stats),
        }
    }

    /// Decodes the snapshot into canonical models.
    pub fn into_parts(self) -> CodecResult<(Vec<Task>, UserStats)> {
        let tasks = self
            .tasks
            .into_iter()
            .map(Task::try_from)
            .collect::<CodecResult<Vec<_>>>()?;
        let stats = UserStats::try_from(self.user_stats)?;
        Ok((tasks, stats))
    }

    pub fn to_json(&self) -> CodecResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(value: &str) -> CodecResult<Self> {
        Ok(serde_json::from_str(value)?)
    }
}

/// Formats an instant the way persisted dates are stored.
pub fn format_instant(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a persisted ISO-8601 instant; any offset is converted to UTC.
pub fn parse_instant(field: &'static str, value: &str) -> CodecResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| CodecError::InvalidInstant {
            field,
            value: value.to_string(),
        })
}

pub fn format_day(value: NaiveDate) -> String {
    value.format(DAY_FORMAT).to_string()
}

pub fn parse_day(field: &'static str, value: &str) -> CodecResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DAY_FORMAT).map_err(|_| CodecError::InvalidDay {
        field,
        value: value.to_string(),
    })
}

fn parse_optional_instant(
    field: &'static str,
    value: Option<String>,
) -> CodecResult<Option<DateTime<Utc>>> {
    value
        .as_deref()
        .map(|raw| parse_instant(field, raw))
        .transpose()
}

impl From<&SubTask> for PersistedSubTask {
    fn from(value: &SubTask) -> Self {
        Self {
            id: value.id.clone(),
            title: value.title.clone(),
            is_completed: value.is_completed,
            due_date: value.due_date.map(format_instant),
            created_at: format_instant(value.created_at),
            updated_at: format_instant(value.updated_at),
        }
    }
}

impl TryFrom<PersistedSubTask> for SubTask {
    type Error = CodecError;

    fn try_from(value: PersistedSubTask) -> CodecResult<Self> {
        Ok(Self {
            id: value.id,
            title: value.title,
            is_completed: value.is_completed,
            due_date: parse_optional_instant("subtasks.dueDate", value.due_date)?,
            created_at: parse_instant("subtasks.createdAt", &value.created_at)?,
            updated_at: parse_instant("subtasks.updatedAt", &value.updated_at)?,
        })
    }
}

impl From<&RecurrenceInfo> for PersistedRecurrence {
    fn from(value: &RecurrenceInfo) -> Self {
        Self {
            kind: value.kind,
            streak: value.streak,
            last_completed_date: value.last_completed_date.map(format_instant),
            next_due_date: value.next_due_date.map(format_instant),
        }
    }
}

impl TryFrom<PersistedRecurrence> for RecurrenceInfo {
    type Error = CodecError;

    fn try_from(value: PersistedRecurrence) -> CodecResult<Self> {
        Ok(Self {
            kind: value.kind,
            streak: value.streak,
            last_completed_date: parse_optional_instant(
                "recurrence.lastCompletedDate",
                value.last_completed_date,
            )?,
            next_due_date: parse_optional_instant("recurrence.nextDueDate", value.next_due_date)?,
        })
    }
}

impl From<&Task> for PersistedTask {
    fn from(value: &Task) -> Self {
        Self {
            id: value.id.clone(),
            title: value.title.clone(),
            description: value.description.clone(),
            due_date: value.due_date.map(format_instant),
            priority: value.priority,
            category: value.category,
            is_completed: value.is_completed,
            created_at: format_instant(value.created_at),
            updated_at: format_instant(value.updated_at),
            recurrence: value.recurrence.as_ref().map(PersistedRecurrence::from),
            subtasks: value.subtasks.iter().map(PersistedSubTask::from).collect(),
        }
    }
}

impl TryFrom<PersistedTask> for Task {
    type Error = CodecError;

    fn try_from(value: PersistedTask) -> CodecResult<Self> {
        let recurrence = match value.recurrence {
            Some(recurrence) if recurrence.kind.is_recurring() => {
                Some(RecurrenceInfo::try_from(recurrence)?)
            }
            _ => None,
        };
        let subtasks = value
            .subtasks
            .into_iter()
            .map(SubTask::try_from)
            .collect::<CodecResult<Vec<_>>>()?;

        Ok(Self {
            id: value.id,
            title: value.title,
            description: value.description,
            priority: value.priority,
            category: value.category,
            is_completed: value.is_completed,
            due_date: parse_optional_instant("dueDate", value.due_date)?,
            created_at: parse_instant("createdAt", &value.created_at)?,
            updated_at: parse_instant("updatedAt", &value.updated_at)?,
            recurrence,
            subtasks,
        })
    }
}

impl From<&UserStats> for PersistedStats {
    fn from(value: &UserStats) -> Self {
        Self {
            total_tasks_completed: value.total_tasks_completed,
            current_streak: value.current_streak,
            longest_streak: value.longest_streak,
            last_completion_date: value.last_completion_date.map(format_day),
            weekly_completions: value.weekly_completions.clone(),
            monthly_completions: value.monthly_completions.clone(),
        }
    }
}

impl TryFrom<PersistedStats> for UserStats {
    type Error = CodecError;

    fn try_from(value: PersistedStats) -> CodecResult<Self> {
        let last_completion_date = value
            .last_completion_date
            .as_deref()
            .map(|raw| parse_day("lastCompletionDate", raw))
            .transpose()?;
        Ok(Self {
            total_tasks_completed: value.total_tasks_completed,
            current_streak: value.current_streak,
            longest_streak: value.longest_streak,
            last_completion_date,
            weekly_completions: value.weekly_completions,
            monthly_completions: value.monthly_completions,
        })
    }
}
