//! Pure scheduling engines invoked by store reducers.
//!
//! # Responsibility
//! - Compute recurring-task rollover without touching store state.
//!
//! # Invariants
//! - Engines are deterministic for a given `(task, now)` input.

pub mod recurrence;
