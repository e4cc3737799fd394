//! Application state repository and SQLite implementation.
//!
//! # Responsibility
//! - Load and save the task collection and user stats as one unit.
//! - Keep SQL details behind the `StateRepository` contract.
//!
//! # Invariants
//! - `save_state` replaces tasks, subtasks and stats in a single transaction;
//!   a failure leaves the previous snapshot intact.
//! - Write paths call `Task::validate()` before any SQL mutation.
//! - Read paths reject invalid persisted data instead of masking it.
//! - Task and subtask order is preserved through `position` columns.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::persisted::{
    format_day, parse_day, CodecError, PersistedRecurrence, PersistedSubTask, PersistedTask,
};
use crate::model::stats::UserStats;
use crate::model::task::{Category, Priority, RecurrenceType, Task, TaskValidationError};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const WEEK_PERIOD: &str = "week";
const MONTH_PERIOD: &str = "month";

const TASK_SELECT_SQL: &str = "SELECT
    position,
    id,
    title,
    description,
    priority,
    category,
    is_completed,
    due_date,
    created_at,
    updated_at,
    recurrence_type,
    recurrence_streak,
    recurrence_last_completed,
    recurrence_next_due
FROM tasks
ORDER BY position ASC";

const SUBTASK_SELECT_SQL: &str = "SELECT
    task_position,
    id,
    title,
    is_completed,
    due_date,
    created_at,
    updated_at
FROM subtasks
ORDER BY task_position ASC, position ASC";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for state persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(TaskValidationError),
    Codec(CodecError),
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Codec(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted state: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<CodecError> for RepoError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Canonical state as loaded from storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredState {
    pub tasks: Vec<Task>,
    pub stats: UserStats,
}

/// Persistence contract for the whole application state.
pub trait StateRepository {
    fn load_state(&self) -> RepoResult<StoredState>;
    fn save_state(&self, tasks: &[Task], stats: &UserStats) -> RepoResult<()>;
}

/// SQLite-backed state repository.
pub struct SqliteStateRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStateRepository<'conn> {
    /// Wraps a connection opened through `db::open_db*`.
    ///
    /// # Errors
    /// - `DbError::UninitializedConnection` when migrations were not applied.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_user_version(conn)?;
        if actual_version != expected_version {
            return Err(RepoError::Db(DbError::UninitializedConnection {
                expected_version,
                actual_version,
            }));
        }
        Ok(Self { conn })
    }
}

impl StateRepository for SqliteStateRepository<'_> {
    fn load_state(&self) -> RepoResult<StoredState> {
        let mut rows = load_task_rows(self.conn)?;
        attach_subtask_rows(self.conn, &mut rows)?;

        let mut tasks = Vec::with_capacity(rows.len());
        for (_, row) in rows {
            let task = Task::try_from(row)?;
            task.validate()?;
            tasks.push(task);
        }
        let stats = load_stats(self.conn)?;

        Ok(StoredState { tasks, stats })
    }

    fn save_state(&self, tasks: &[Task], stats: &UserStats) -> RepoResult<()> {
        for task in tasks {
            task.validate()?;
        }

        let started_at = Instant::now();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "DELETE FROM subtasks;
             DELETE FROM tasks;
             DELETE FROM period_completions;",
        )?;

        {
            let mut insert_task = tx.prepare(
                "INSERT INTO tasks (
                    position,
                    id,
                    title,
                    description,
                    priority,
                    category,
                    is_completed,
                    due_date,
                    created_at,
                    updated_at,
                    recurrence_type,
                    recurrence_streak,
                    recurrence_last_completed,
                    recurrence_next_due
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
            )?;
            let mut insert_subtask = tx.prepare(
                "INSERT INTO subtasks (
                    task_position,
                    position,
                    id,
                    title,
                    is_completed,
                    due_date,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            )?;

            for (position, task) in tasks.iter().enumerate() {
                let row = PersistedTask::from(task);
                let recurrence = row.recurrence.as_ref();
                insert_task.execute(params![
                    position,
                    row.id,
                    row.title,
                    row.description,
                    row.priority.as_str(),
                    row.category.as_str(),
                    bool_to_int(row.is_completed),
                    row.due_date,
                    row.created_at,
                    row.updated_at,
                    recurrence.map(|info| info.kind.as_str()),
                    recurrence.map_or(0, |info| info.streak),
                    recurrence.and_then(|info| info.last_completed_date.as_deref()),
                    recurrence.and_then(|info| info.next_due_date.as_deref()),
                ])?;

                for (subtask_position, subtask) in row.subtasks.iter().enumerate() {
                    insert_subtask.execute(params![
                        position,
                        subtask_position,
                        subtask.id,
                        subtask.title,
                        bool_to_int(subtask.is_completed),
                        subtask.due_date,
                        subtask.created_at,
                        subtask.updated_at,
                    ])?;
                }
            }

            tx.execute(
                "INSERT OR REPLACE INTO user_stats (
                    singleton,
                    total_tasks_completed,
                    current_streak,
                    longest_streak,
                    last_completion_date
                ) VALUES (1, ?1, ?2, ?3, ?4);",
                params![
                    stats.total_tasks_completed,
                    stats.current_streak,
                    stats.longest_streak,
                    stats.last_completion_date.map(format_day),
                ],
            )?;

            let mut insert_period = tx.prepare(
                "INSERT INTO period_completions (period_kind, period_key, completions)
                 VALUES (?1, ?2, ?3);",
            )?;
            for (key, count) in &stats.weekly_completions {
                insert_period.execute(params![WEEK_PERIOD, key, count])?;
            }
            for (key, count) in &stats.monthly_completions {
                insert_period.execute(params![MONTH_PERIOD, key, count])?;
            }
        }

        tx.commit()?;
        info!(
            "event=state_save module=repo status=ok tasks={} duration_ms={}",
            tasks.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }
}

fn load_task_rows(conn: &Connection) -> RepoResult<Vec<(i64, PersistedTask)>> {
    let mut stmt = conn.prepare(TASK_SELECT_SQL)?;
    let mut rows = stmt.query([])?;
    let mut tasks = Vec::new();
    while let Some(row) = rows.next()? {
        tasks.push(parse_task_row(row)?);
    }
    Ok(tasks)
}

fn attach_subtask_rows(conn: &Connection, tasks: &mut [(i64, PersistedTask)]) -> RepoResult<()> {
    let index_by_position: HashMap<i64, usize> = tasks
        .iter()
        .enumerate()
        .map(|(index, (position, _))| (*position, index))
        .collect();

    let mut stmt = conn.prepare(SUBTASK_SELECT_SQL)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let task_position: i64 = row.get("task_position")?;
        let index = index_by_position.get(&task_position).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "subtask references missing task position {task_position}"
            ))
        })?;
        let subtask = PersistedSubTask {
            id: row.get("id")?,
            title: row.get("title")?,
            is_completed: parse_bool(row, "is_completed")?,
            due_date: row.get("due_date")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        };
        tasks[*index].1.subtasks.push(subtask);
    }
    Ok(())
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<(i64, PersistedTask)> {
    let priority_text: String = row.get("priority")?;
    let priority = Priority::parse(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid priority `{priority_text}` in tasks.priority"))
    })?;

    let category_text: String = row.get("category")?;
    let category = Category::parse(&category_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid category `{category_text}` in tasks.category"))
    })?;

    let recurrence = match row.get::<_, Option<String>>("recurrence_type")? {
        Some(kind_text) => {
            let kind = RecurrenceType::parse(&kind_text).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid recurrence type `{kind_text}` in tasks.recurrence_type"
                ))
            })?;
            Some(PersistedRecurrence {
                kind,
                streak: row.get("recurrence_streak")?,
                last_completed_date: row.get("recurrence_last_completed")?,
                next_due_date: row.get("recurrence_next_due")?,
            })
        }
        None => None,
    };

    let task = PersistedTask {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        due_date: row.get("due_date")?,
        priority,
        category,
        is_completed: parse_bool(row, "is_completed")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        recurrence,
        subtasks: Vec::new(),
    };
    Ok((row.get("position")?, task))
}

fn load_stats(conn: &Connection) -> RepoResult<UserStats> {
    let header = conn
        .query_row(
            "SELECT total_tasks_completed, current_streak, longest_streak, last_completion_date
             FROM user_stats
             WHERE singleton = 1;",
            [],
            |row| {
                Ok((
                    row.get::<_, u64>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((total, current, longest, last_day)) = header else {
        return Ok(UserStats::default());
    };

    let mut weekly = BTreeMap::new();
    let mut monthly = BTreeMap::new();
    let mut stmt = conn.prepare(
        "SELECT period_kind, period_key, completions
         FROM period_completions
         ORDER BY period_kind ASC, period_key ASC;",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let kind: String = row.get(0)?;
        let key: String = row.get(1)?;
        let count: u32 = row.get(2)?;
        match kind.as_str() {
            WEEK_PERIOD => weekly.insert(key, count),
            MONTH_PERIOD => monthly.insert(key, count),
            other => {
                return Err(RepoError::InvalidData(format!(
                    "invalid period kind `{other}` in period_completions.period_kind"
                )));
            }
        };
    }

    Ok(UserStats {
        total_tasks_completed: total,
        current_streak: current,
        longest_streak: longest,
        last_completion_date: last_day
            .as_deref()
            .map(|raw| parse_day("user_stats.last_completion_date", raw))
            .transpose()?,
        weekly_completions: weekly,
        monthly_completions: monthly,
    })
}

fn parse_bool(row: &Row<'_>, column: &str) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean `{other}` in column {column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
