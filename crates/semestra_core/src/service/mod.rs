//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Enforce ownership, duplicate and validation rules above persistence.
//!
//! # Invariants
//! - Every mutating operation re-verifies existence and ownership itself,
//!   even when callers (such as the command planner) already checked.

pub mod event_service;
pub mod subject_service;
pub mod user_service;
