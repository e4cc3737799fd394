use chrono::{DateTime, Duration, TimeZone, Utc};
use dailydo_core::{reduce, SubTask, Task, TaskCommand, TaskEvent, TaskState};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap()
}

fn task_with_subtasks(id: &str, subtask_ids: &[&str]) -> Task {
    let mut task = Task::new(id, format!("task {id}"), t0());
    task.subtasks = subtask_ids
        .iter()
        .map(|sub_id| SubTask::with_id(*sub_id, format!("step {sub_id}"), t0()))
        .collect();
    task
}

fn ids(state: &TaskState) -> Vec<&str> {
    state.tasks().iter().map(|task| task.id.as_str()).collect()
}

#[test]
fn add_appends_without_duplicate_check() {
    let state = TaskState::new();
    let (state, _) = reduce(state, TaskCommand::Add(Task::new("a", "A", t0())), t0());
    let (state, _) = reduce(state, TaskCommand::Add(Task::new("a", "again", t0())), t0());

    assert_eq!(state.len(), 2);
    assert_eq!(ids(&state), vec!["a", "a"]);
}

#[test]
fn update_and_delete_of_unknown_id_are_no_ops() {
    let state = TaskState::from_tasks(vec![Task::new("a", "A", t0())]);
    let before = state.clone();

    let (state, events) = reduce(
        state,
        TaskCommand::Update(Task::new("ghost", "G", t0())),
        t0(),
    );
    assert!(events.is_empty());
    let (state, _) = reduce(state, TaskCommand::Delete("ghost".to_string()), t0());
    let (state, _) = reduce(
        state,
        TaskCommand::ToggleCompletion("ghost".to_string()),
        t0(),
    );

    assert_eq!(state, before);
}

#[test]
fn delete_removes_matching_task() {
    let state = TaskState::from_tasks(vec![Task::new("a", "A", t0()), Task::new("b", "B", t0())]);
    let (state, _) = reduce(state, TaskCommand::Delete("a".to_string()), t0());
    assert_eq!(ids(&state), vec!["b"]);
}

#[test]
fn completing_non_recurring_task_forces_all_subtasks_complete() {
    let state = TaskState::from_tasks(vec![task_with_subtasks("a", &["s1", "s2", "s3"])]);
    let now = t0() + Duration::hours(1);

    let (state, events) = reduce(state, TaskCommand::ToggleCompletion("a".to_string()), now);

    let task = state.task("a").unwrap();
    assert!(task.is_completed);
    assert_eq!(task.updated_at, now);
    assert!(task
        .subtasks
        .iter()
        .all(|subtask| subtask.is_completed && subtask.updated_at == now));
    assert_eq!(
        events,
        vec![TaskEvent::Completed {
            task_id: "a".to_string(),
            recurring: false,
        }]
    );
}

#[test]
fn uncompleting_leaves_subtasks_untouched_and_emits_no_completion() {
    let state = TaskState::from_tasks(vec![task_with_subtasks("a", &["s1", "s2"])]);
    let first = t0() + Duration::hours(1);
    let (state, _) = reduce(state, TaskCommand::ToggleCompletion("a".to_string()), first);

    let second = first + Duration::hours(1);
    let (state, events) = reduce(state, TaskCommand::ToggleCompletion("a".to_string()), second);

    let task = state.task("a").unwrap();
    assert!(!task.is_completed);
    assert_eq!(task.updated_at, second);
    assert!(task.subtasks.iter().all(|subtask| subtask.is_completed));
    assert!(task
        .subtasks
        .iter()
        .all(|subtask| subtask.updated_at == first));
    assert_eq!(
        events,
        vec![TaskEvent::Reopened {
            task_id: "a".to_string()
        }]
    );
}

#[test]
fn reorder_with_current_order_is_idempotent_after_normalization() {
    let precise = t0() + Duration::nanoseconds(123_456_789);
    let mut task_a = Task::new("a", "A", precise);
    task_a.subtasks.push(SubTask::with_id("s1", "one", precise));
    let state = TaskState::from_tasks(vec![task_a, Task::new("b", "B", t0())]);

    let current = state.tasks().to_vec();
    let (once, _) = reduce(state, TaskCommand::Reorder(current), t0());
    let normalized = once.clone();
    let again = once.tasks().to_vec();
    let (twice, _) = reduce(once, TaskCommand::Reorder(again), t0());

    assert_eq!(twice, normalized);
    assert_eq!(ids(&twice), vec!["a", "b"]);
    let stored = twice.task("a").unwrap();
    assert_eq!(stored.created_at, t0() + Duration::milliseconds(123));
    assert_eq!(
        stored.subtasks[0].updated_at,
        t0() + Duration::milliseconds(123)
    );
}

#[test]
fn reorder_replaces_whole_collection() {
    let state = TaskState::from_tasks(vec![Task::new("a", "A", t0()), Task::new("b", "B", t0())]);
    let reversed: Vec<Task> = state.tasks().iter().rev().cloned().collect();

    let (state, _) = reduce(state, TaskCommand::Reorder(reversed), t0());
    assert_eq!(ids(&state), vec!["b", "a"]);
}

#[test]
fn subtask_commands_mutate_only_the_parent() {
    let state = TaskState::from_tasks(vec![
        task_with_subtasks("a", &["s1", "s2"]),
        task_with_subtasks("b", &["s1"]),
    ]);
    let now = t0() + Duration::minutes(5);

    let (state, _) = reduce(
        state,
        TaskCommand::AddSubTask {
            task_id: "a".to_string(),
            subtask: SubTask::with_id("s3", "three", now),
        },
        now,
    );
    let (state, _) = reduce(
        state,
        TaskCommand::DeleteSubTask {
            task_id: "a".to_string(),
            subtask_id: "s1".to_string(),
        },
        now,
    );
    let reordered = {
        let parent = state.task("a").unwrap();
        parent.subtasks.iter().rev().cloned().collect()
    };
    let (state, _) = reduce(
        state,
        TaskCommand::ReorderSubTasks {
            task_id: "a".to_string(),
            subtasks: reordered,
        },
        now,
    );

    let parent = state.task("a").unwrap();
    let sub_ids: Vec<&str> = parent.subtasks.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(sub_ids, vec!["s3", "s2"]);
    assert_eq!(parent.updated_at, now);
    assert_eq!(state.task("b").unwrap().subtasks.len(), 1);
    assert_eq!(state.task("b").unwrap().updated_at, t0());
}

#[test]
fn read_helpers_split_pending_completed_and_overdue() {
    let now = t0() + Duration::days(2);
    let mut overdue = Task::new("late", "late", t0());
    overdue.due_date = Some(t0());
    let mut due_today = Task::new("today", "today", t0());
    due_today.due_date = Some(now - Duration::hours(1));
    let mut done = Task::new("done", "done", t0());
    done.is_completed = true;
    done.due_date = Some(t0());

    let state = TaskState::from_tasks(vec![overdue, due_today, done]);

    let overdue_ids: Vec<&str> = state.overdue_tasks(now).map(|t| t.id.as_str()).collect();
    assert_eq!(overdue_ids, vec!["late"]);
    assert_eq!(state.pending_tasks().count(), 2);
    assert_eq!(state.completed_tasks().count(), 1);
}
