use chrono::{DateTime, Duration, TimeZone, Utc};
use dailydo_core::db::open_db_in_memory;
use dailydo_core::{
    Clock, FixedClock, RecurrenceType, RepoError, RepoResult, ServiceError,
    SqliteStateRepository, StateRepository, StoredState, Task, TaskDraft, TaskValidationError,
    TodoService, UserStats,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 8, 0, 0).unwrap()
}

/// In-memory repository whose saves can be switched to fail.
#[derive(Default)]
struct FlakyRepo {
    saved: RefCell<Option<StoredState>>,
    fail_saves: Cell<bool>,
}

impl StateRepository for &FlakyRepo {
    fn load_state(&self) -> RepoResult<StoredState> {
        Ok(self.saved.borrow().clone().unwrap_or_default())
    }

    fn save_state(&self, tasks: &[Task], stats: &UserStats) -> RepoResult<()> {
        if self.fail_saves.get() {
            return Err(RepoError::InvalidData("disk full".to_string()));
        }
        *self.saved.borrow_mut() = Some(StoredState {
            tasks: tasks.to_vec(),
            stats: stats.clone(),
        });
        Ok(())
    }
}

#[test]
fn create_task_persists_through_sqlite() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(t0());
    let repo = SqliteStateRepository::try_new(&conn).unwrap();
    let mut service = TodoService::open(repo, &clock).unwrap();

    let mut draft = TaskDraft::new("  Stretch  ");
    draft.description = Some("   ".to_string());
    draft.due_date = Some(t0() + Duration::hours(2));
    draft.recurrence = RecurrenceType::Daily;
    let task_id = service.create_task(draft).unwrap();

    assert_eq!(task_id, t0().timestamp_millis().to_string());
    let task = service.task(&task_id).unwrap();
    assert_eq!(task.title, "Stretch");
    assert!(task.description.is_none());
    assert_eq!(
        task.recurrence.as_ref().unwrap().next_due_date,
        Some(t0() + Duration::hours(2))
    );

    let reopened = SqliteStateRepository::try_new(&conn).unwrap();
    let stored = reopened.load_state().unwrap();
    assert_eq!(stored.tasks, service.tasks());
}

#[test]
fn create_task_rejects_blank_title_without_touching_state() {
    let repo = FlakyRepo::default();
    let clock = FixedClock::new(t0());
    let mut service = TodoService::open(&repo, &clock).unwrap();

    let err = service.create_task(TaskDraft::new("   ")).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(TaskValidationError::EmptyTitle)
    ));
    assert!(service.tasks().is_empty());
    assert_eq!(service.session().revision(), 0);
    assert!(repo.saved.borrow().is_none());
}

#[test]
fn completing_recurring_task_advances_it_and_records_stats() {
    let repo = FlakyRepo::default();
    let clock = FixedClock::new(t0());
    let mut service = TodoService::open(&repo, &clock).unwrap();

    let mut draft = TaskDraft::new("Journal");
    draft.due_date = Some(t0() + Duration::hours(12));
    draft.recurrence = RecurrenceType::Weekly;
    let task_id = service.create_task(draft).unwrap();

    clock.advance(Duration::hours(1));
    let outcome = service.toggle_task_completion(task_id.clone()).unwrap();
    assert_eq!(outcome.completions, 1);

    let task = service.task(&task_id).unwrap();
    assert!(!task.is_completed);
    assert_eq!(task.due_date, Some(t0() + Duration::days(7) + Duration::hours(12)));
    assert_eq!(task.recurrence.as_ref().unwrap().streak, 1);

    let stats = service.user_stats();
    assert_eq!(stats.total_tasks_completed, 1);
    assert_eq!(stats.current_streak, 1);
    assert_eq!(repo.saved.borrow().as_ref().unwrap().stats, *stats);
}

#[test]
fn completing_last_subtask_auto_completes_parent_once() {
    let repo = FlakyRepo::default();
    let clock = FixedClock::new(t0());
    let mut service = TodoService::open(&repo, &clock).unwrap();

    let task_id = service.create_task(TaskDraft::new("Pack bag")).unwrap();
    let first = service.add_subtask(&task_id, "Laptop").unwrap();
    let second = service.add_subtask(&task_id, " Charger ").unwrap();
    assert_eq!(service.task(&task_id).unwrap().subtasks[1].title, "Charger");

    let outcome = service.toggle_subtask(task_id.clone(), first).unwrap();
    assert!(outcome.auto_completed.is_empty());
    assert!(!service.task(&task_id).unwrap().is_completed);

    clock.advance(Duration::minutes(3));
    let outcome = service.toggle_subtask(task_id.clone(), second.clone()).unwrap();
    assert_eq!(outcome.auto_completed, vec![task_id.clone()]);
    assert_eq!(outcome.completions, 1);
    assert!(service.task(&task_id).unwrap().is_completed);
    assert_eq!(service.user_stats().total_tasks_completed, 1);

    // Unchecking and re-checking the subtask completes the parent only
    // while the parent is still open.
    service.toggle_subtask(task_id.clone(), second.clone()).unwrap();
    let outcome = service.toggle_subtask(task_id.clone(), second).unwrap();
    assert!(outcome.auto_completed.is_empty());
    assert_eq!(service.user_stats().total_tasks_completed, 1);
}

#[test]
fn failed_save_rolls_back_memory_state() {
    let repo = FlakyRepo::default();
    let clock = FixedClock::new(t0());
    let mut service = TodoService::open(&repo, &clock).unwrap();
    let task_id = service.create_task(TaskDraft::new("Call mom")).unwrap();
    let revision = service.session().revision();

    repo.fail_saves.set(true);
    let err = service.toggle_task_completion(task_id.clone()).unwrap_err();
    assert!(matches!(err, ServiceError::Repo(RepoError::InvalidData(_))));

    assert!(!service.task(&task_id).unwrap().is_completed);
    assert_eq!(service.user_stats(), &UserStats::default());
    assert_eq!(service.session().revision(), revision);
}

#[test]
fn raw_add_with_invalid_task_is_rejected_by_sqlite_repo() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(t0());
    let repo = SqliteStateRepository::try_new(&conn).unwrap();
    let mut service = TodoService::open(repo, &clock).unwrap();

    let err = service
        .add_task(Task::new("1", "", clock.now()))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Repo(RepoError::Validation(TaskValidationError::EmptyTitle))
    ));
    assert!(service.tasks().is_empty());
}

#[test]
fn edit_task_keeps_identity_and_reports_missing_ids() {
    let repo = FlakyRepo::default();
    let clock = FixedClock::new(t0());
    let mut service = TodoService::open(&repo, &clock).unwrap();
    let task_id = service.create_task(TaskDraft::new("Draft")).unwrap();

    clock.advance(Duration::minutes(10));
    service
        .edit_task(&task_id, TaskDraft::new("Final title"))
        .unwrap();
    let task = service.task(&task_id).unwrap();
    assert_eq!(task.title, "Final title");
    assert_eq!(task.created_at, t0());
    assert_eq!(task.updated_at, t0() + Duration::minutes(10));

    let err = service
        .edit_task("missing", TaskDraft::new("x"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::TaskNotFound(id) if id == "missing"));
}

#[test]
fn reorder_by_ids_and_subtask_reorder() {
    let repo = FlakyRepo::default();
    let clock = FixedClock::new(t0());
    let mut service = TodoService::open(&repo, &clock).unwrap();

    let a = service.create_task(TaskDraft::new("A")).unwrap();
    clock.advance(Duration::seconds(1));
    let b = service.create_task(TaskDraft::new("B")).unwrap();
    clock.advance(Duration::seconds(1));
    let c = service.create_task(TaskDraft::new("C")).unwrap();

    service
        .reorder_tasks_by_id(&[c.clone(), "ghost".to_string(), a.clone()])
        .unwrap();
    let order: Vec<&str> = service.tasks().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(order, vec![c.as_str(), a.as_str(), b.as_str()]);

    let s1 = service.add_subtask(&a, "one").unwrap();
    let s2 = service.add_subtask(&a, "two").unwrap();
    let s3 = service.add_subtask(&a, "three").unwrap();
    service.reorder_subtasks(&a, &[s3.clone(), s1.clone()]).unwrap();
    let sub_order: Vec<String> = service
        .task(&a)
        .unwrap()
        .subtasks
        .iter()
        .map(|subtask| subtask.id.clone())
        .collect();
    assert_eq!(sub_order, vec![s3, s1, s2.clone()]);

    let err = service
        .reorder_subtasks(&a, &["nope".to_string()])
        .unwrap_err();
    assert!(matches!(err, ServiceError::SubTaskNotFound { .. }));

    service.delete_subtask(a.clone(), s2).unwrap();
    assert_eq!(service.task(&a).unwrap().subtasks.len(), 2);
    service.delete_task(b.clone()).unwrap();
    assert!(service.task(&b).is_none());
}

#[test]
fn add_subtask_validates_parent_and_title() {
    let repo = FlakyRepo::default();
    let clock = FixedClock::new(t0());
    let mut service = TodoService::open(&repo, &clock).unwrap();
    let task_id = service.create_task(TaskDraft::new("Parent")).unwrap();

    assert!(matches!(
        service.add_subtask("missing", "x").unwrap_err(),
        ServiceError::TaskNotFound(_)
    ));
    let err = service.add_subtask(&task_id, "  ").unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(TaskValidationError::EmptySubTaskTitle { subtask_id: None })
    ));
    assert_eq!(err.to_string(), "subtask title cannot be empty");
}

#[test]
fn subscribers_see_each_committed_revision() {
    let repo = FlakyRepo::default();
    let clock = FixedClock::new(t0());
    let mut service = TodoService::open(&repo, &clock).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    service
        .session_mut()
        .subscribe(move |revision, tasks, stats| {
            sink.borrow_mut()
                .push((revision, tasks.len(), stats.total_tasks_completed));
        });

    let task_id = service.create_task(TaskDraft::new("Listen")).unwrap();
    service.toggle_task_completion(task_id).unwrap();

    assert_eq!(*seen.borrow(), vec![(1, 1, 0), (2, 1, 1)]);
}

#[test]
fn failed_commit_is_never_published() {
    let repo = FlakyRepo::default();
    let clock = FixedClock::new(t0());
    let mut service = TodoService::open(&repo, &clock).unwrap();
    let task_id = service.create_task(TaskDraft::new("Water lawn")).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    service
        .session_mut()
        .subscribe(move |revision, tasks, stats| {
            let completed = tasks.completed_tasks().count();
            sink.borrow_mut()
                .push((revision, completed, stats.total_tasks_completed));
        });

    repo.fail_saves.set(true);
    service.toggle_task_completion(task_id.clone()).unwrap_err();
    assert!(seen.borrow().is_empty());

    repo.fail_saves.set(false);
    clock.advance(Duration::seconds(1));
    service.create_task(TaskDraft::new("Sweep porch")).unwrap();

    assert_eq!(*seen.borrow(), vec![(2, 0, 0)]);
    assert!(!service.task(&task_id).unwrap().is_completed);
}

#[test]
fn deleting_the_last_open_subtask_auto_completes_parent() {
    let repo = FlakyRepo::default();
    let clock = FixedClock::new(t0());
    let mut service = TodoService::open(&repo, &clock).unwrap();

    let task_id = service.create_task(TaskDraft::new("Clean desk")).unwrap();
    let done = service.add_subtask(&task_id, "Dust").unwrap();
    let open = service.add_subtask(&task_id, "Polish").unwrap();
    service.toggle_subtask(task_id.clone(), done).unwrap();
    assert!(!service.task(&task_id).unwrap().is_completed);

    let outcome = service.delete_subtask(task_id.clone(), open).unwrap();

    assert_eq!(outcome.auto_completed, vec![task_id.clone()]);
    assert_eq!(outcome.completions, 1);
    assert!(service.task(&task_id).unwrap().is_completed);
    assert_eq!(service.user_stats().total_tasks_completed, 1);
}

#[test]
fn deleting_the_only_subtask_leaves_parent_open() {
    let repo = FlakyRepo::default();
    let clock = FixedClock::new(t0());
    let mut service = TodoService::open(&repo, &clock).unwrap();

    let task_id = service.create_task(TaskDraft::new("Plan trip")).unwrap();
    let only = service.add_subtask(&task_id, "Book hotel").unwrap();

    let outcome = service.delete_subtask(task_id.clone(), only).unwrap();

    assert!(outcome.auto_completed.is_empty());
    assert!(!service.task(&task_id).unwrap().is_completed);
}

#[test]
fn open_restores_previously_saved_state() {
    let repo = FlakyRepo::default();
    let clock = FixedClock::new(t0());
    let task_id = {
        let mut service = TodoService::open(&repo, &clock).unwrap();
        let task_id = service.create_task(TaskDraft::new("Persist me")).unwrap();
        service.toggle_task_completion(task_id.clone()).unwrap();
        task_id
    };

    let service = TodoService::open(&repo, &clock).unwrap();
    assert!(service.task(&task_id).unwrap().is_completed);
    assert_eq!(service.user_stats().total_tasks_completed, 1);
}

#[test]
fn tasks_created_in_the_same_millisecond_get_distinct_ids() {
    let repo = FlakyRepo::default();
    let clock = FixedClock::new(t0());
    let mut service = TodoService::open(&repo, &clock).unwrap();

    let first = service.create_task(TaskDraft::new("one")).unwrap();
    let second = service.create_task(TaskDraft::new("two")).unwrap();

    assert_eq!(first, t0().timestamp_millis().to_string());
    assert_eq!(second, (t0().timestamp_millis() + 1).to_string());
}
