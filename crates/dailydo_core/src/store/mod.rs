//! In-memory state containers and reducers.
//!
//! # Responsibility
//! - Hold task and stats aggregates as explicit values, never as globals.
//! - Expose reducers `(state, command, now) -> (state, events)`.
//!
//! # Invariants
//! - The task store and stats tracker never read each other's state; they
//!   are connected only through `TaskEvent::Completed` in `session`.

pub mod session;
pub mod stats_store;
pub mod task_store;
