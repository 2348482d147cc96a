//! Plan execution with per-action failure isolation.
//!
//! # Responsibility
//! - Apply allowed actions through the domain services, in input order.
//! - Contain every per-action failure so sibling actions still run.
//!
//! # Invariants
//! - Actions with `allow = false` are never executed; they yield `skipped`
//!   outcomes carrying the stored conflict reason.
//! - No direct persistence access: the executor only dispatches to the
//!   subject/event services, which re-verify existence and ownership.
//! - Best-effort semantics: committed sibling actions are not rolled back
//!   when a later action fails.

use crate::model::event::{Event, EventDraft, EventId, EventPatch};
use crate::model::subject::{Subject, SubjectDraft, SubjectId, SubjectPatch};
use crate::model::user::UserId;
use crate::nl::action::{ActionOp, CheckedAction, Seq};
use crate::repo::event_repo::SqliteEventRepository;
use crate::repo::subject_repo::SqliteSubjectRepository;
use crate::service::event_service::EventService;
use crate::service::subject_service::SubjectService;
use chrono::NaiveDate;
use log::info;
use rusqlite::Connection;
use serde::Serialize;
use std::time::Instant;
use uuid::Uuid;

/// Outcome classification of one executed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Error,
    Skipped,
}

/// Reference to a hard-deleted resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DeletedRef {
    Subject { subject_id: SubjectId },
    Event { event_id: EventId },
}

/// Result payload; serialized under the external contract's keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExecutionPayload {
    #[serde(rename = "materia")]
    Subject(Subject),
    #[serde(rename = "evento")]
    Event(Event),
    #[serde(rename = "deleted")]
    Deleted(DeletedRef),
    #[serde(rename = "error")]
    Error(String),
}

/// Outcome of one action, in plan order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub seq: Seq,
    pub kind: &'static str,
    pub status: ExecutionStatus,
    #[serde(flatten)]
    pub payload: ExecutionPayload,
    pub description: String,
}

/// Batch-level totals reported after multi-action executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    pub total: usize,
    pub success: usize,
    pub error: usize,
    pub skipped: usize,
}

/// Full outcome of one execution pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    /// Per-action outcomes matching the input action order.
    pub results: Vec<ExecutionResult>,
    /// Present when more than one action was submitted.
    pub summary: Option<ExecutionSummary>,
}

/// Executes checked actions in order with uniform error containment.
pub fn execute_actions(
    conn: &Connection,
    owner: UserId,
    actions: &[CheckedAction],
) -> ExecutionReport {
    let started_at = Instant::now();
    let plan_id = Uuid::new_v4();

    let mut results = Vec::with_capacity(actions.len());
    for checked in actions {
        results.push(execute_one(conn, owner, checked));
    }

    let summary = if actions.len() > 1 {
        Some(ExecutionSummary {
            total: results.len(),
            success: count_status(&results, ExecutionStatus::Success),
            error: count_status(&results, ExecutionStatus::Error),
            skipped: count_status(&results, ExecutionStatus::Skipped),
        })
    } else {
        None
    };

    info!(
        "event=nl_execute module=nl status=ok plan_id={plan_id} owner={owner} actions={} success={} error={} skipped={} duration_ms={}",
        results.len(),
        count_status(&results, ExecutionStatus::Success),
        count_status(&results, ExecutionStatus::Error),
        count_status(&results, ExecutionStatus::Skipped),
        started_at.elapsed().as_millis()
    );

    ExecutionReport { results, summary }
}

fn execute_one(conn: &Connection, owner: UserId, checked: &CheckedAction) -> ExecutionResult {
    let kind = checked.op().kind();
    let description = checked.action.description.clone();

    if !checked.verdict.allow {
        let reason = checked
            .verdict
            .conflict
            .clone()
            .unwrap_or_else(|| "bloqueada en la planificación".to_string());
        return ExecutionResult {
            seq: checked.seq(),
            kind,
            status: ExecutionStatus::Skipped,
            payload: ExecutionPayload::Error(reason),
            description,
        };
    }

    match dispatch(conn, owner, checked.op()) {
        Ok(payload) => ExecutionResult {
            seq: checked.seq(),
            kind,
            status: ExecutionStatus::Success,
            payload,
            description,
        },
        Err(message) => ExecutionResult {
            seq: checked.seq(),
            kind,
            status: ExecutionStatus::Error,
            payload: ExecutionPayload::Error(message),
            description,
        },
    }
}

/// Runs one allowed action through the domain services. Every failure,
/// including infrastructure errors, is flattened to a message so siblings
/// keep executing.
fn dispatch(conn: &Connection, owner: UserId, op: &ActionOp) -> Result<ExecutionPayload, String> {
    match op {
        ActionOp::CreateSubject { name, description } => {
            let service = subject_service(conn)?;
            let draft = SubjectDraft {
                name: name.clone(),
                description: description.clone(),
            };
            let subject = service
                .create_subject(owner, &draft)
                .map_err(|err| err.to_string())?;
            Ok(ExecutionPayload::Subject(subject))
        }

        ActionOp::UpdateSubject {
            subject_id,
            name,
            description,
        } => {
            let service = subject_service(conn)?;
            let patch = SubjectPatch {
                name: name.clone(),
                description: description.clone(),
            };
            let subject = service
                .update_subject(owner, *subject_id, &patch)
                .map_err(|err| err.to_string())?;
            Ok(ExecutionPayload::Subject(subject))
        }

        ActionOp::DeleteSubject { subject_id } => {
            let service = subject_service(conn)?;
            service
                .delete_subject(owner, *subject_id)
                .map_err(|err| err.to_string())?;
            Ok(ExecutionPayload::Deleted(DeletedRef::Subject {
                subject_id: *subject_id,
            }))
        }

        ActionOp::CreateEvent {
            subject_id,
            name,
            date,
            description,
            status,
        } => {
            let service = event_service(conn)?;
            let draft = EventDraft {
                subject_id: *subject_id,
                name: name.clone(),
                description: description.clone(),
                date: parse_date(date)?,
                status: *status,
            };
            let event = service
                .create_event(owner, &draft)
                .map_err(|err| err.to_string())?;
            Ok(ExecutionPayload::Event(event))
        }

        ActionOp::UpdateEvent {
            event_id,
            name,
            date,
            status,
            description,
        } => {
            let service = event_service(conn)?;
            let patch = EventPatch {
                name: name.clone(),
                description: description.clone(),
                date: date.as_deref().map(parse_date).transpose()?,
                status: *status,
            };
            let event = service
                .update_event(owner, *event_id, &patch)
                .map_err(|err| err.to_string())?;
            Ok(ExecutionPayload::Event(event))
        }

        ActionOp::DeleteEvent { event_id } => {
            let service = event_service(conn)?;
            service
                .delete_event(owner, *event_id)
                .map_err(|err| err.to_string())?;
            Ok(ExecutionPayload::Deleted(DeletedRef::Event {
                event_id: *event_id,
            }))
        }
    }
}

fn subject_service(
    conn: &Connection,
) -> Result<SubjectService<SqliteSubjectRepository<'_>>, String> {
    let repo = SqliteSubjectRepository::try_new(conn).map_err(|err| err.to_string())?;
    Ok(SubjectService::new(repo))
}

fn event_service(
    conn: &Connection,
) -> Result<EventService<SqliteEventRepository<'_>, SqliteSubjectRepository<'_>>, String> {
    let events = SqliteEventRepository::try_new(conn).map_err(|err| err.to_string())?;
    let subjects = SqliteSubjectRepository::try_new(conn).map_err(|err| err.to_string())?;
    Ok(EventService::new(events, subjects))
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("fecha inválida: '{value}' (se espera YYYY-MM-DD)"))
}

fn count_status(results: &[ExecutionResult], status: ExecutionStatus) -> usize {
    results.iter().filter(|result| result.status == status).count()
}
