//! User stats reducer and derived profile views.
//!
//! # Responsibility
//! - Record one completion per Incomplete -> Completed transition.
//! - Maintain the user-level day streak and per-period counters.
//! - Derive profile progress and achievements.
//!
//! # Invariants
//! - Multiple completions on one calendar day never inflate the day streak.
//! - A gap of two or more days restarts the streak at 1.
//! - Period keys follow ISO-8601 week numbering (`YYYY-Www`) and `YYYY-MM`.

use crate::model::stats::{Achievement, UserStats};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use log::debug;

/// Each weekly completion fills this many percent of the weekly bar.
const WEEKLY_PERCENT_PER_COMPLETION: u32 = 10;
/// Each monthly completion fills this many percent of the monthly bar.
const MONTHLY_PERCENT_PER_COMPLETION: u32 = 2;

/// Records one task completion at `now`.
pub fn record_completion(mut stats: UserStats, now: DateTime<Utc>) -> UserStats {
    let today = now.date_naive();

    stats.total_tasks_completed = stats.total_tasks_completed.saturating_add(1);
    *stats.weekly_completions.entry(iso_week_key(today)).or_insert(0) += 1;
    *stats.monthly_completions.entry(month_key(today)).or_insert(0) += 1;

    match stats.last_completion_date {
        Some(last) => {
            let day_diff = (today - last).num_days();
            if day_diff == 1 {
                stats.current_streak = stats.current_streak.saturating_add(1);
                stats.longest_streak = stats.longest_streak.max(stats.current_streak);
            } else if day_diff > 1 {
                stats.current_streak = 1;
            }
        }
        None => {
            stats.current_streak = 1;
            stats.longest_streak = 1;
        }
    }
    stats.last_completion_date = Some(today);

    debug!(
        "event=stats_record module=store status=ok total={} current_streak={} longest_streak={}",
        stats.total_tasks_completed, stats.current_streak, stats.longest_streak
    );
    stats
}

/// ISO-8601 week key, e.g. `2024-W01`. The year is the ISO week-year.
pub fn iso_week_key(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{:04}-W{:02}", week.year(), week.week())
}

/// Calendar month key, e.g. `2024-01`.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

pub fn completions_in_week(stats: &UserStats, now: DateTime<Utc>) -> u32 {
    stats
        .weekly_completions
        .get(&iso_week_key(now.date_naive()))
        .copied()
        .unwrap_or(0)
}

pub fn completions_in_month(stats: &UserStats, now: DateTime<Utc>) -> u32 {
    stats
        .monthly_completions
        .get(&month_key(now.date_naive()))
        .copied()
        .unwrap_or(0)
}

/// Weekly progress bar fill, capped at 100.
pub fn weekly_progress_percent(stats: &UserStats, now: DateTime<Utc>) -> u32 {
    completions_in_week(stats, now)
        .saturating_mul(WEEKLY_PERCENT_PER_COMPLETION)
        .min(100)
}

/// Monthly progress bar fill, capped at 100.
pub fn monthly_progress_percent(stats: &UserStats, now: DateTime<Utc>) -> u32 {
    completions_in_month(stats, now)
        .saturating_mul(MONTHLY_PERCENT_PER_COMPLETION)
        .min(100)
}

pub fn unlocked_achievements(stats: &UserStats) -> Vec<Achievement> {
    Achievement::ALL
        .into_iter()
        .filter(|achievement| achievement.is_unlocked(stats))
        .collect()
}
