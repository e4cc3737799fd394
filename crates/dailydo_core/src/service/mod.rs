//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate session dispatch and persistence into use-case APIs.
//! - Keep UI/FFI layers decoupled from storage and reducer details.

pub mod todo_service;
