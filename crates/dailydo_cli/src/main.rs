//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `dailydo_core` linkage.
//! - With a database path argument, print a task and stats summary.
//!
//! Usage: `dailydo [DB_PATH]`. Logging follows `DAILYDO_LOG_LEVEL` and
//! `DAILYDO_LOG_DIR`.

use dailydo_core::db::open_db;
use dailydo_core::{
    init_logging_with_config, logging_status, monthly_progress_percent, unlocked_achievements,
    weekly_progress_percent, Clock, CoreConfig, SqliteStateRepository, SystemClock, TodoService,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("dailydo_core ping={}", dailydo_core::ping());
    println!("dailydo_core version={}", dailydo_core::core_version());

    match CoreConfig::from_env().and_then(|config| init_logging_with_config(&config)) {
        Ok(()) => {
            if let Some((level, log_dir)) = logging_status() {
                println!("logging level={} dir={}", level, log_dir.display());
            }
        }
        Err(err) => eprintln!("warning: logging disabled: {err}"),
    }

    let Some(db_path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };
    match print_summary(&db_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_summary(db_path: &str) -> Result<(), String> {
    let conn = open_db(db_path).map_err(|err| err.to_string())?;
    let repo = SqliteStateRepository::try_new(&conn).map_err(|err| err.to_string())?;
    let service = TodoService::open(repo, SystemClock).map_err(|err| err.to_string())?;
    let now = service.clock().now();
    let tasks = service.session().task_state();
    let stats = service.user_stats();

    println!(
        "tasks total={} pending={} completed={} overdue={}",
        tasks.len(),
        tasks.pending_tasks().count(),
        tasks.completed_tasks().count(),
        tasks.overdue_tasks(now).count()
    );
    println!(
        "stats completed={} current_streak={} longest_streak={}",
        stats.total_tasks_completed, stats.current_streak, stats.longest_streak
    );
    println!(
        "progress weekly={}% monthly={}%",
        weekly_progress_percent(stats, now),
        monthly_progress_percent(stats, now)
    );
    let badges: Vec<&str> = unlocked_achievements(stats)
        .into_iter()
        .map(|achievement| achievement.label())
        .collect();
    println!("achievements=[{}]", badges.join(", "));
    Ok(())
}
