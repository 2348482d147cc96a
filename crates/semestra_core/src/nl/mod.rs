//! Natural-language command planning and execution pipeline.
//!
//! # Responsibility
//! - Turn the tool calls extracted by an external LLM into validated,
//!   ownership-checked, idempotency-gated actions (`planner`).
//! - Apply allowed actions through the domain services with per-action
//!   failure isolation (`executor`).
//!
//! # Invariants
//! - One bad instruction never aborts the batch: domain failures degrade to
//!   per-action errors, conflicts or skips.
//! - Every mutating action passes the ownership guard before it can be
//!   marked allowed, and the domain services re-verify on execution.
//! - Action and result ordering follows tool-call input order; each carries
//!   an explicit sequence number for user-facing numbering.

pub mod action;
pub mod adapter;
pub mod checker;
pub mod executor;
pub mod guard;
pub mod normalizer;
pub mod planner;
pub mod resolver;
pub mod wire;

pub use action::{ActionOp, CheckedAction, PlanResult, PlanVerdict, PlannedAction, Seq};
pub use adapter::{AdapterError, LlmAdapter, ToolCall, DEFAULT_LOCALE};
pub use executor::{
    execute_actions, ExecutionPayload, ExecutionReport, ExecutionResult, ExecutionStatus,
    ExecutionSummary,
};
pub use planner::{plan_from_text, plan_tool_calls};
pub use wire::{decode_actions, execution_records, serialize_plan, DecodeError};
