//! Existence-based idempotency checking for planned actions.
//!
//! # Responsibility
//! - Decide per action whether it may execute: creates require the natural
//!   key to be absent, updates/deletes require the target to exist and be
//!   owned.
//! - Annotate each action with resolved identifiers and a conflict reason
//!   when blocked.
//!
//! # Invariants
//! - Symmetric operations are refused: an action can never both create and
//!   mutate the same conceptual resource within one plan.
//! - Resolved identifiers pass the ownership guard before `allow` can be
//!   true; the domain services re-verify at execution time.

use crate::model::user::UserId;
use crate::nl::action::{ActionOp, CheckedAction, PlanVerdict, PlannedAction};
use crate::nl::guard::{assert_event_owned, assert_subject_owned, GuardError};
use crate::repo::event_repo::{EventRepository, SqliteEventRepository};
use crate::repo::subject_repo::{SqliteSubjectRepository, SubjectRepository};
use crate::repo::RepoResult;
use chrono::NaiveDate;
use rusqlite::Connection;

const SUBJECT_EXISTS: &str = "La materia ya existe; solo se permite update/delete.";
const SUBJECT_MISSING: &str = "La materia no existe; no se permite update/delete.";
const SUBJECT_MISSING_FOR_EVENT: &str = "La materia no existe; no se puede crear el evento.";
const EVENT_EXISTS: &str = "El evento ya existe; solo se permite update/delete.";
const EVENT_MISSING: &str = "El evento no existe; no se permite update/delete.";

/// Runs the idempotency/existence verdict over every planned action.
///
/// Domain outcomes (missing, foreign, duplicate) become verdicts; only
/// infrastructure errors propagate.
pub fn check_actions(
    conn: &Connection,
    owner: UserId,
    actions: Vec<PlannedAction>,
) -> RepoResult<Vec<CheckedAction>> {
    actions
        .into_iter()
        .map(|action| {
            let verdict = verdict_for(conn, owner, &action.op)?;
            Ok(CheckedAction { action, verdict })
        })
        .collect()
}

fn verdict_for(conn: &Connection, owner: UserId, op: &ActionOp) -> RepoResult<PlanVerdict> {
    match op {
        ActionOp::CreateSubject { name, .. } => {
            let subjects = SqliteSubjectRepository::try_new(conn)?;
            match subjects.find_by_owner_and_name(owner, name)? {
                Some(existing) => Ok(PlanVerdict::blocked(SUBJECT_EXISTS)
                    .with_resolved("subject_id", Some(existing.subject_id))),
                None => Ok(PlanVerdict::allowed().with_resolved("subject_id", None)),
            }
        }

        ActionOp::UpdateSubject { subject_id, .. } | ActionOp::DeleteSubject { subject_id } => {
            match assert_subject_owned(conn, owner, *subject_id) {
                Ok(subject) => Ok(PlanVerdict::allowed()
                    .with_resolved("subject_id", Some(subject.subject_id))),
                Err(GuardError::Repo(err)) => Err(err),
                Err(_) => {
                    Ok(PlanVerdict::blocked(SUBJECT_MISSING).with_resolved("subject_id", None))
                }
            }
        }

        ActionOp::CreateEvent {
            subject_id,
            name,
            date,
            ..
        } => {
            match assert_subject_owned(conn, owner, *subject_id) {
                Ok(_) => {}
                Err(GuardError::Repo(err)) => return Err(err),
                Err(_) => {
                    return Ok(PlanVerdict::blocked(SUBJECT_MISSING_FOR_EVENT)
                        .with_resolved("subject_id", Some(*subject_id)));
                }
            }

            // An unparseable date can never match a stored natural key, so
            // the create stays allowed and the executor reports the date.
            let existing = match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
                Ok(parsed) => {
                    let events = SqliteEventRepository::try_new(conn)?;
                    events.find_by_natural_key(*subject_id, name, parsed)?
                }
                Err(_) => None,
            };

            match existing {
                Some(event) => Ok(PlanVerdict::blocked(EVENT_EXISTS)
                    .with_resolved("subject_id", Some(*subject_id))
                    .with_resolved("event_id", Some(event.event_id))),
                None => Ok(PlanVerdict::allowed()
                    .with_resolved("subject_id", Some(*subject_id))
                    .with_resolved("event_id", None)),
            }
        }

        ActionOp::UpdateEvent { event_id, .. } | ActionOp::DeleteEvent { event_id } => {
            match assert_event_owned(conn, owner, *event_id) {
                Ok(event) => Ok(PlanVerdict::allowed()
                    .with_resolved("event_id", Some(event.event_id))
                    .with_resolved("subject_id", Some(event.subject_id))),
                Err(GuardError::Repo(err)) => Err(err),
                Err(_) => Ok(PlanVerdict::blocked(EVENT_MISSING).with_resolved("event_id", None)),
            }
        }
    }
}
