//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level task and stats functions to Dart via FRB.
//! - Keep error semantics simple: every call returns an envelope with `ok`
//!   and a human-readable `message`.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Calls touching the store are serialized behind one process-wide lock;
//!   each call loads state, runs one command and commits before returning.
//! - Task data crosses the boundary as the persisted camelCase JSON shape.

use dailydo_core::db::open_db;
use dailydo_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Category, CoreConfig, PersistedState, PersistedTask, Priority, RecurrenceType,
    ServiceResult, SqliteStateRepository, SystemClock, Task, TaskDraft, TodoService,
};
use chrono::{DateTime, Utc};
use log::warn;
use std::path::PathBuf;
use std::sync::Mutex;

static STORE_DB_PATH: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Form input for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    /// `LOW|MEDIUM|HIGH|URGENT`; empty means `MEDIUM`.
    pub priority: String,
    /// `WORK|PERSONAL|HEALTH|SHOPPING|OTHER`; empty means `OTHER`.
    pub category: String,
    pub due_date_epoch_ms: Option<i64>,
    /// `NONE|DAILY|WEEKLY|MONTHLY`; empty means `NONE`.
    pub recurrence: String,
}

/// Action response envelope for store commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Created or affected task/subtask ID, when the command yields one.
    pub item_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl TaskActionResponse {
    fn success(message: impl Into<String>, item_id: Option<String>) -> Self {
        Self {
            ok: true,
            item_id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            item_id: None,
            message: message.into(),
        }
    }
}

/// Read response envelope carrying a JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonResponse {
    pub ok: bool,
    /// JSON payload; empty on failure.
    pub json: String,
    pub message: String,
}

impl JsonResponse {
    fn from_result(op: &str, result: Result<String, String>) -> Self {
        match result {
            Ok(json) => Self {
                ok: true,
                json,
                message: String::new(),
            },
            Err(err) => Self {
                ok: false,
                json: String::new(),
                message: format!("{op} failed: {err}"),
            },
        }
    }
}

/// Points the store at `db_path`, creating and migrating the file if needed.
///
/// Without this call the path comes from `DAILYDO_DB_PATH` or the temp dir.
#[flutter_rust_bridge::frb(sync)]
pub fn open_store(db_path: String) -> TaskActionResponse {
    let trimmed = db_path.trim();
    if trimmed.is_empty() {
        return TaskActionResponse::failure("open_store failed: db_path cannot be empty");
    }
    let path = PathBuf::from(trimmed);

    let mut slot = match STORE_DB_PATH.lock() {
        Ok(slot) => slot,
        Err(_) => return TaskActionResponse::failure("open_store failed: store lock poisoned"),
    };
    let opened = open_db(&path)
        .map_err(|err| err.to_string())
        .and_then(|conn| {
            SqliteStateRepository::try_new(&conn)
                .map(|_| ())
                .map_err(|err| err.to_string())
        });
    match opened {
        Ok(()) => {
            *slot = Some(path);
            TaskActionResponse::success("Store opened.", None)
        }
        Err(err) => {
            warn!("event=ffi_call module=ffi status=error op=open_store");
            TaskActionResponse::failure(format!("open_store failed: {err}"))
        }
    }
}

/// Returns all tasks in display order as a JSON array.
#[flutter_rust_bridge::frb(sync)]
pub fn list_tasks_json() -> JsonResponse {
    let result = with_todo_service("list_tasks_json", |service| {
        Ok(PersistedState::from_parts(service.tasks(), service.user_stats()).tasks)
    })
    .and_then(|tasks| serde_json::to_string(&tasks).map_err(|err| err.to_string()));
    JsonResponse::from_result("list_tasks_json", result)
}

/// Returns user stats as a JSON object.
#[flutter_rust_bridge::frb(sync)]
pub fn user_stats_json() -> JsonResponse {
    let result = with_todo_service("user_stats_json", |service| {
        Ok(PersistedState::from_parts(&[], service.user_stats()).user_stats)
    })
    .and_then(|stats| serde_json::to_string(&stats).map_err(|err| err.to_string()));
    JsonResponse::from_result("user_stats_json", result)
}

/// Creates a task from form input.
#[flutter_rust_bridge::frb(sync)]
pub fn add_task(input: TaskInput) -> TaskActionResponse {
    let draft = match to_task_draft(input) {
        Ok(draft) => draft,
        Err(err) => return TaskActionResponse::failure(format!("add_task failed: {err}")),
    };
    respond(
        "add_task",
        "Task created.",
        with_todo_service("add_task", |service| service.create_task(draft).map(Some)),
    )
}

/// Replaces a stored task with the given persisted-shape JSON object.
#[flutter_rust_bridge::frb(sync)]
pub fn update_task_json(task_json: String) -> TaskActionResponse {
    let task = match parse_task_json(&task_json) {
        Ok(task) => task,
        Err(err) => {
            return TaskActionResponse::failure(format!("update_task_json failed: {err}"))
        }
    };
    let task_id = task.id.clone();
    respond(
        "update_task_json",
        "Task updated.",
        with_todo_service("update_task_json", |service| {
            service.update_task(task).map(|_| Some(task_id))
        }),
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn delete_task(task_id: String) -> TaskActionResponse {
    respond(
        "delete_task",
        "Task deleted.",
        with_todo_service("delete_task", |service| {
            service.delete_task(task_id.clone()).map(|_| Some(task_id))
        }),
    )
}

/// Toggles completion; recurring tasks advance to their next occurrence.
#[flutter_rust_bridge::frb(sync)]
pub fn toggle_task_completion(task_id: String) -> TaskActionResponse {
    let result = with_todo_service("toggle_task_completion", |service| {
        service.toggle_task_completion(task_id.clone())
    });
    match result {
        Ok(outcome) if outcome.completions > 0 => {
            TaskActionResponse::success("Task completed.", Some(task_id))
        }
        Ok(_) => TaskActionResponse::success("Task reopened.", Some(task_id)),
        Err(err) => TaskActionResponse::failure(format!("toggle_task_completion failed: {err}")),
    }
}

/// Reorders tasks by ID; unknown IDs are skipped, unlisted tasks move last.
#[flutter_rust_bridge::frb(sync)]
pub fn reorder_tasks(task_ids: Vec<String>) -> TaskActionResponse {
    respond(
        "reorder_tasks",
        "Tasks reordered.",
        with_todo_service("reorder_tasks", |service| {
            service.reorder_tasks_by_id(&task_ids).map(|_| None)
        }),
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn add_subtask(task_id: String, title: String) -> TaskActionResponse {
    respond(
        "add_subtask",
        "Subtask added.",
        with_todo_service("add_subtask", |service| {
            service.add_subtask(&task_id, title).map(Some)
        }),
    )
}

/// Toggles a subtask; completing the last open one completes the parent.
#[flutter_rust_bridge::frb(sync)]
pub fn toggle_subtask(task_id: String, subtask_id: String) -> TaskActionResponse {
    let result = with_todo_service("toggle_subtask", |service| {
        service.toggle_subtask(task_id, subtask_id.clone())
    });
    match result {
        Ok(outcome) if !outcome.auto_completed.is_empty() => {
            TaskActionResponse::success("Subtask toggled; task completed.", Some(subtask_id))
        }
        Ok(_) => TaskActionResponse::success("Subtask toggled.", Some(subtask_id)),
        Err(err) => TaskActionResponse::failure(format!("toggle_subtask failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn delete_subtask(task_id: String, subtask_id: String) -> TaskActionResponse {
    respond(
        "delete_subtask",
        "Subtask deleted.",
        with_todo_service("delete_subtask", |service| {
            service.delete_subtask(task_id, subtask_id.clone()).map(|_| Some(subtask_id))
        }),
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn reorder_subtasks(task_id: String, subtask_ids: Vec<String>) -> TaskActionResponse {
    respond(
        "reorder_subtasks",
        "Subtasks reordered.",
        with_todo_service("reorder_subtasks", |service| {
            service.reorder_subtasks(&task_id, &subtask_ids).map(|_| None)
        }),
    )
}

fn respond(
    op: &str,
    message: &str,
    result: Result<Option<String>, String>,
) -> TaskActionResponse {
    match result {
        Ok(item_id) => TaskActionResponse::success(message, item_id),
        Err(err) => TaskActionResponse::failure(format!("{op} failed: {err}")),
    }
}

fn to_task_draft(input: TaskInput) -> Result<TaskDraft, String> {
    let priority = parse_label(&input.priority, Priority::parse, "priority")?;
    let category = parse_label(&input.category, Category::parse, "category")?;
    let recurrence = parse_label(&input.recurrence, RecurrenceType::parse, "recurrence")?;
    let due_date = input
        .due_date_epoch_ms
        .map(|millis| {
            DateTime::<Utc>::from_timestamp_millis(millis)
                .ok_or_else(|| format!("due_date_epoch_ms out of range: {millis}"))
        })
        .transpose()?;

    Ok(TaskDraft {
        title: input.title,
        description: input.description,
        priority,
        category,
        due_date,
        recurrence,
    })
}

fn parse_label<T: Default>(
    raw: &str,
    parse: impl Fn(&str) -> Option<T>,
    field: &str,
) -> Result<T, String> {
    let normalized = raw.trim().to_ascii_uppercase();
    if normalized.is_empty() {
        return Ok(T::default());
    }
    parse(&normalized).ok_or_else(|| format!("unsupported {field} `{}`", raw.trim()))
}

fn parse_task_json(raw: &str) -> Result<Task, String> {
    let persisted: PersistedTask = serde_json::from_str(raw).map_err(|err| err.to_string())?;
    let task = Task::try_from(persisted).map_err(|err| err.to_string())?;
    task.validate().map_err(|err| err.to_string())?;
    Ok(task)
}

fn resolve_store_db_path(slot: &Option<PathBuf>) -> Result<PathBuf, String> {
    match slot {
        Some(path) => Ok(path.clone()),
        None => CoreConfig::from_env().map(|config| config.db_path),
    }
}

fn with_todo_service<T>(
    op: &str,
    f: impl FnOnce(&mut TodoService<SqliteStateRepository<'_>, SystemClock>) -> ServiceResult<T>,
) -> Result<T, String> {
    let slot = STORE_DB_PATH
        .lock()
        .map_err(|_| "store lock poisoned".to_string())?;
    let db_path = resolve_store_db_path(&slot)?;
    let conn = open_db(&db_path).map_err(|err| format!("store DB open failed: {err}"))?;
    let repo = SqliteStateRepository::try_new(&conn)
        .map_err(|err| format!("store repo init failed: {err}"))?;
    let mut service = TodoService::open(repo, SystemClock)
        .map_err(|err| format!("store load failed: {err}"))?;

    f(&mut service).map_err(|err| {
        warn!("event=ffi_call module=ffi status=error op={op}");
        err.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::{
        add_subtask, add_task, core_version, delete_task, init_logging, list_tasks_json,
        open_store, ping, reorder_tasks, toggle_subtask, toggle_task_completion,
        update_task_json, user_stats_json, TaskInput,
    };
    use serde_json::Value;
    use std::sync::{Mutex, MutexGuard};
    use std::time::{SystemTime, UNIX_EPOCH};
    use tempfile::TempDir;

    static STORE_TESTS: Mutex<()> = Mutex::new(());

    /// Exclusive store backed by a temp dir removed on drop.
    struct TestStore {
        _dir: TempDir,
        _guard: MutexGuard<'static, ()>,
    }

    fn use_test_store() -> TestStore {
        let guard = STORE_TESTS
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("dailydo.sqlite3");
        let response = open_store(path.to_string_lossy().into_owned());
        assert!(response.ok, "{}", response.message);
        TestStore {
            _dir: dir,
            _guard: guard,
        }
    }

    fn input(title: &str) -> TaskInput {
        TaskInput {
            title: title.to_string(),
            description: None,
            priority: String::new(),
            category: "work".to_string(),
            due_date_epoch_ms: None,
            recurrence: String::new(),
        }
    }

    fn find_task(task_id: &str) -> Value {
        let response = list_tasks_json();
        assert!(response.ok, "{}", response.message);
        let tasks: Vec<Value> = serde_json::from_str(&response.json).expect("tasks json");
        tasks
            .into_iter()
            .find(|task| task["id"] == task_id)
            .expect("task should be listed")
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn open_store_rejects_blank_path() {
        let response = open_store("  ".to_string());
        assert!(!response.ok);
        assert!(response.message.contains("empty"));
    }

    #[test]
    fn add_task_normalizes_labels_and_lists_camel_case_json() {
        let _store = use_test_store();
        let title = unique_token("add");
        let created = add_task(input(&title));
        assert!(created.ok, "{}", created.message);
        let task_id = created.item_id.expect("add should return task id");

        let task = find_task(&task_id);
        assert_eq!(task["title"], title.as_str());
        assert_eq!(task["category"], "WORK");
        assert_eq!(task["priority"], "MEDIUM");
        assert_eq!(task["isCompleted"], false);
    }

    #[test]
    fn add_task_rejects_unknown_priority() {
        let mut bad = input("bad priority");
        bad.priority = "someday".to_string();
        let response = add_task(bad);
        assert!(!response.ok);
        assert!(response.message.contains("priority"));
    }

    #[test]
    fn toggle_completion_counts_in_user_stats() {
        let _store = use_test_store();
        let created = add_task(input(&unique_token("toggle")));
        let task_id = created.item_id.expect("add should return task id");

        let toggled = toggle_task_completion(task_id.clone());
        assert!(toggled.ok, "{}", toggled.message);
        assert_eq!(toggled.message, "Task completed.");
        assert_eq!(find_task(&task_id)["isCompleted"], true);

        let stats = user_stats_json();
        assert!(stats.ok, "{}", stats.message);
        let stats: Value = serde_json::from_str(&stats.json).expect("stats json");
        assert!(stats["totalTasksCompleted"].as_u64().unwrap_or(0) >= 1);

        let reopened = toggle_task_completion(task_id);
        assert_eq!(reopened.message, "Task reopened.");
    }

    #[test]
    fn completing_last_subtask_completes_parent() {
        let _store = use_test_store();
        let task_id = add_task(input(&unique_token("subtasks")))
            .item_id
            .expect("add should return task id");
        let subtask = add_subtask(task_id.clone(), "only step".to_string());
        assert!(subtask.ok, "{}", subtask.message);
        let subtask_id = subtask.item_id.expect("subtask id");

        let toggled = toggle_subtask(task_id.clone(), subtask_id);
        assert!(toggled.ok, "{}", toggled.message);
        assert!(toggled.message.contains("task completed"));
        assert_eq!(find_task(&task_id)["isCompleted"], true);
    }

    #[test]
    fn update_task_json_round_trips_listed_shape() {
        let _store = use_test_store();
        let task_id = add_task(input(&unique_token("update")))
            .item_id
            .expect("add should return task id");

        let mut task = find_task(&task_id);
        task["title"] = Value::from("renamed");
        let response = update_task_json(task.to_string());
        assert!(response.ok, "{}", response.message);
        assert_eq!(find_task(&task_id)["title"], "renamed");

        let broken = update_task_json("{\"id\":1}".to_string());
        assert!(!broken.ok);
    }

    #[test]
    fn reorder_and_delete_by_id() {
        let _store = use_test_store();
        let task_id = add_task(input(&unique_token("reorder")))
            .item_id
            .expect("add should return task id");

        let reordered = reorder_tasks(vec![task_id.clone()]);
        assert!(reordered.ok, "{}", reordered.message);
        let listed: Vec<Value> =
            serde_json::from_str(&list_tasks_json().json).expect("tasks json");
        assert_eq!(listed[0]["id"], task_id.as_str());

        let deleted = delete_task(task_id.clone());
        assert!(deleted.ok, "{}", deleted.message);
        let listed: Vec<Value> =
            serde_json::from_str(&list_tasks_json().json).expect("tasks json");
        assert!(listed.iter().all(|task| task["id"] != task_id.as_str()));
    }
}
