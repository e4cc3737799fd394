//! Recurring-task rollover.
//!
//! # Responsibility
//! - Reset a just-completed recurring task to its next occurrence.
//! - Maintain the per-task on-time completion streak.
//!
//! # Invariants
//! - The due date always advances by exactly one period from the old due
//!   date, never from the completion instant.
//! - On-time means same UTC calendar day as the due date; time of day is
//!   ignored.
//! - A task without due date (or without a recurring cadence) is returned
//!   unchanged and stays completed.
//! - A task with no recorded completion is treated as completed on time.

use crate::model::task::{RecurrenceType, Task};
use chrono::{DateTime, Days, Months, Utc};
use log::{debug, warn};

/// Rolls a just-completed recurring task over to its next occurrence.
///
/// The caller stamps `recurrence.last_completed_date` with the completion
/// instant before invoking this function.
pub fn advance(mut task: Task, now: DateTime<Utc>) -> Task {
    let Some(due_date) = task.due_date else {
        debug!("event=recurrence_advance module=engine status=skipped reason=no_due_date");
        return task;
    };
    let Some(recurrence) = task.recurrence.as_mut() else {
        return task;
    };
    let Some(next_due) = next_occurrence(due_date, recurrence.kind) else {
        warn!(
            "event=recurrence_advance module=engine status=skipped reason=no_next_occurrence kind={}",
            recurrence.kind.as_str()
        );
        return task;
    };

    let on_time = recurrence
        .last_completed_date
        .map_or(true, |completed| is_same_calendar_day(completed, due_date));

    recurrence.streak = if on_time {
        recurrence.streak.saturating_add(1)
    } else {
        0
    };
    recurrence.next_due_date = Some(next_due);
    let kind = recurrence.kind;
    let streak = recurrence.streak;

    task.is_completed = false;
    task.due_date = Some(next_due);
    task.reset_subtasks(now);
    task.touch(now);

    debug!(
        "event=recurrence_advance module=engine status=ok kind={} on_time={} streak={}",
        kind.as_str(),
        on_time,
        streak
    );
    task
}

/// Returns the due date one period after `due_date`.
///
/// Monthly steps clamp to the last day of shorter months. Returns `None` for
/// `RecurrenceType::None` or on calendar overflow.
pub fn next_occurrence(due_date: DateTime<Utc>, kind: RecurrenceType) -> Option<DateTime<Utc>> {
    match kind {
        RecurrenceType::None => None,
        RecurrenceType::Daily => due_date.checked_add_days(Days::new(1)),
        RecurrenceType::Weekly => due_date.checked_add_days(Days::new(7)),
        RecurrenceType::Monthly => due_date.checked_add_months(Months::new(1)),
    }
}

/// Date-only equality on the UTC calendar.
pub fn is_same_calendar_day(left: DateTime<Utc>, right: DateTime<Utc>) -> bool {
    left.date_naive() == right.date_naive()
}
