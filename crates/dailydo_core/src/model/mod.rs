//! Domain model for tasks, subtasks and user statistics.
//!
//! # Responsibility
//! - Define the canonical in-memory shapes used by store reducers.
//! - Keep the string-dated persisted shape isolated in `persisted`.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - Instants are UTC; calendar-day logic uses the UTC date.

pub mod draft;
pub mod persisted;
pub mod stats;
pub mod task;
