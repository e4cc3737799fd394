//! Core domain logic for DailyDo.
//! This crate is the single source of truth for task, recurrence and
//! streak invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::CoreConfig;
pub use engine::recurrence::{advance, is_same_calendar_day, next_occurrence};
pub use logging::{default_log_level, init_logging, init_logging_with_config, logging_status};
pub use model::draft::TaskDraft;
pub use model::persisted::{
    CodecError, PersistedRecurrence, PersistedState, PersistedStats, PersistedSubTask,
    PersistedTask,
};
pub use model::stats::{Achievement, UserStats};
pub use model::task::{
    Category, Priority, RecurrenceInfo, RecurrenceType, SubTask, SubTaskId, Task, TaskId,
    TaskValidationError,
};
pub use repo::state_repo::{
    RepoError, RepoResult, SqliteStateRepository, StateRepository, StoredState,
};
pub use service::todo_service::{ServiceError, ServiceResult, TodoService};
pub use store::session::{DispatchOutcome, Session};
pub use store::stats_store::{
    completions_in_month, completions_in_week, iso_week_key, month_key,
    monthly_progress_percent, record_completion, unlocked_achievements, weekly_progress_percent,
};
pub use store::task_store::{reduce, TaskCommand, TaskEvent, TaskState};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
