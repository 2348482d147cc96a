//! Batch planning: tool calls to a checked, explained plan.
//!
//! # Responsibility
//! - Orchestrate normalizer and checker over a whole tool-call batch.
//! - Build the user-facing plan summary (Spanish).
//! - Degrade language-model failures to an empty plan.
//!
//! # Invariants
//! - A failure on one tool call never discards the results of the others.
//! - Action order follows tool-call input order; no action is silently
//!   dropped: every tool call yields an action or an error line.

use crate::model::user::UserId;
use crate::nl::action::{ActionOp, CheckedAction, PlanResult};
use crate::nl::adapter::{LlmAdapter, ToolCall};
use crate::nl::checker::check_actions;
use crate::nl::normalizer::normalize_tool_call;
use crate::repo::RepoResult;
use log::{info, warn};
use rusqlite::Connection;
use std::time::Instant;
use uuid::Uuid;

const SUMMARY_HEADER: &str = "Resultado del plan (verificación de existencias):";
const EMPTY_PLAN_SUMMARY: &str =
    "No se detectaron acciones. Podés reformular o ser más específico.";

/// Extracts tool calls for `text` through the adapter and plans them.
///
/// An adapter failure is recoverable by contract: it degrades to zero tool
/// calls, so the user is asked to rephrase instead of seeing a server error.
pub fn plan_from_text(
    conn: &Connection,
    owner: UserId,
    text: &str,
    adapter: &dyn LlmAdapter,
    locale: &str,
) -> RepoResult<PlanResult> {
    let tool_calls = match adapter.get_tool_calls(text, locale) {
        Ok(calls) => calls,
        Err(err) => {
            warn!("event=nl_llm module=nl status=degraded error={err}");
            Vec::new()
        }
    };
    plan_tool_calls(conn, owner, &tool_calls)
}

/// Plans a batch of tool calls: normalize each, check all, summarize.
pub fn plan_tool_calls(
    conn: &Connection,
    owner: UserId,
    tool_calls: &[ToolCall],
) -> RepoResult<PlanResult> {
    let started_at = Instant::now();
    let plan_id = Uuid::new_v4();

    let mut planned = Vec::new();
    let mut errors = Vec::new();
    let mut seq = 0;
    for call in tool_calls {
        let (actions, call_errors) = normalize_tool_call(conn, owner, call, &mut seq)?;
        planned.extend(actions);
        errors.extend(call_errors);
    }

    if planned.is_empty() && errors.is_empty() {
        info!(
            "event=nl_plan module=nl status=empty plan_id={plan_id} owner={owner} tool_calls={} duration_ms={}",
            tool_calls.len(),
            started_at.elapsed().as_millis()
        );
        return Ok(PlanResult {
            actions: Vec::new(),
            errors: Vec::new(),
            summary: EMPTY_PLAN_SUMMARY.to_string(),
        });
    }

    let actions = check_actions(conn, owner, planned)?;
    let summary = build_summary(&actions, &errors, tool_calls.len());

    info!(
        "event=nl_plan module=nl status=ok plan_id={plan_id} owner={owner} tool_calls={} actions={} allowed={} errors={} duration_ms={}",
        tool_calls.len(),
        actions.len(),
        actions.iter().filter(|action| action.verdict.allow).count(),
        errors.len(),
        started_at.elapsed().as_millis()
    );

    Ok(PlanResult {
        actions,
        errors,
        summary,
    })
}

/// Builds the plan explanation: blocking errors first, one glyph line per
/// action, and aggregate totals when the batch held several instructions.
fn build_summary(actions: &[CheckedAction], errors: &[String], tool_call_count: usize) -> String {
    let mut lines = vec![SUMMARY_HEADER.to_string()];

    for error in errors {
        lines.push(format!("✖ {error}"));
    }
    for action in actions {
        lines.push(summary_line(action));
    }

    if tool_call_count > 1 {
        let detected = actions.len() + errors.len();
        let executable = actions.iter().filter(|action| action.verdict.allow).count();
        let errored = detected - executable;
        lines.push(format!(
            "Total: {detected} detectadas, {executable} ejecutables, {errored} con error."
        ));
    }

    lines.join("\n")
}

fn summary_line(checked: &CheckedAction) -> String {
    let description = &checked.action.description;

    if checked.verdict.allow {
        return match checked.op() {
            ActionOp::CreateSubject { .. } | ActionOp::CreateEvent { .. } => {
                format!("✔ {description}: permitido (no existe).")
            }
            _ => format!("✔ {description}: permitido."),
        };
    }

    let existing_id = match checked.op() {
        ActionOp::CreateSubject { .. } => checked.verdict.resolved.get("subject_id"),
        ActionOp::CreateEvent { .. } => checked.verdict.resolved.get("event_id"),
        _ => None,
    }
    .copied()
    .flatten();

    match existing_id {
        Some(id) => format!("✖ {description}: ya existe (id={id})."),
        None => {
            let reason = checked
                .verdict
                .conflict
                .as_deref()
                .unwrap_or("bloqueada por verificación de existencias.");
            format!("✖ {description}: {reason}")
        }
    }
}
