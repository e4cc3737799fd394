//! User-level completion statistics.
//!
//! # Invariants
//! - Counters only grow; reopening a task never decrements them.
//! - `longest_streak >= current_streak` after every recorded completion that
//!   extends a streak.
//! - Period keys are `YYYY-Www` (ISO week) and `YYYY-MM`.

use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Aggregate owned by the stats tracker for one user session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserStats {
    pub total_tasks_completed: u64,
    /// Consecutive calendar days with at least one completion.
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Calendar day (UTC) of the most recent completion.
    pub last_completion_date: Option<NaiveDate>,
    pub weekly_completions: BTreeMap<String, u32>,
    pub monthly_completions: BTreeMap<String, u32>,
}

/// Profile badges unlocked by stats thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Achievement {
    TenTasks,
    SevenDayStreak,
    FiftyTasks,
}

impl Achievement {
    pub const ALL: [Achievement; 3] = [Self::TenTasks, Self::SevenDayStreak, Self::FiftyTasks];

    pub fn label(self) -> &'static str {
        match self {
            Self::TenTasks => "10 Tasks",
            Self::SevenDayStreak => "7 Day Streak",
            Self::FiftyTasks => "50 Tasks",
        }
    }

    pub fn is_unlocked(self, stats: &UserStats) -> bool {
        match self {
            Self::TenTasks => stats.total_tasks_completed >= 10,
            Self::SevenDayStreak => stats.current_streak >= 7,
            Self::FiftyTasks => stats.total_tasks_completed >= 50,
        }
    }
}
