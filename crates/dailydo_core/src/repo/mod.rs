//! Persistence contracts and implementations.
//!
//! # Responsibility
//! - Define the storage contract used by the service layer.
//! - Keep SQLite details out of store reducers and services.
//!
//! # Invariants
//! - Writes validate tasks before persistence.
//! - Tasks and stats are committed together.

pub mod state_repo;
