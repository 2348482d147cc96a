//! Name-based reference resolution for tool-call arguments.
//!
//! # Responsibility
//! - Resolve subject/event names mentioned by the user to concrete ids,
//!   scoped to the requesting owner.
//!
//! # Invariants
//! - Read-only: resolution never mutates state.
//! - Ambiguity fails closed: anything but a unique match resolves to `None`,
//!   never to a guess.

use crate::model::event::EventId;
use crate::model::subject::SubjectId;
use crate::model::user::UserId;
use crate::repo::RepoResult;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

/// Resolves a subject reference by exact (trimmed) name match.
pub fn resolve_subject_ref(
    conn: &Connection,
    owner: UserId,
    name: &str,
) -> RepoResult<Option<SubjectId>> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let mut stmt = conn.prepare(
        "SELECT subject_id
         FROM subjects
         WHERE owner_id = ?1
           AND name = ?2;",
    )?;
    let mut rows = stmt.query(params![owner, trimmed])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(row.get(0)?));
    }
    Ok(None)
}

/// Resolves an event reference from optional event/subject name fragments.
///
/// A candidate set scoped to the owner is filtered by case-insensitive
/// substring on the subject name and on the event name, when given. The
/// reference resolves only when it pins down exactly one event:
/// - exactly one candidate resolves directly;
/// - with several candidates, no event fragment and a subject fragment, the
///   set is narrowed to the exactly-named subject's events and resolves if
///   one remains;
/// - anything else is unresolved.
pub fn resolve_event_ref(
    conn: &Connection,
    owner: UserId,
    event_ref: Option<&str>,
    subject_ref: Option<&str>,
) -> RepoResult<Option<EventId>> {
    let event_fragment = non_blank(event_ref);
    let subject_fragment = non_blank(subject_ref);
    if event_fragment.is_none() && subject_fragment.is_none() {
        return Ok(None);
    }

    let candidates = load_candidates(conn, owner, event_fragment, subject_fragment)?;
    if candidates.len() == 1 {
        return Ok(Some(candidates[0].event_id));
    }

    if candidates.len() > 1 && event_fragment.is_none() {
        if let Some(fragment) = subject_fragment {
            if let Some(subject_id) = resolve_subject_ref(conn, owner, fragment)? {
                let narrowed: Vec<&Candidate> = candidates
                    .iter()
                    .filter(|candidate| candidate.subject_id == subject_id)
                    .collect();
                if narrowed.len() == 1 {
                    return Ok(Some(narrowed[0].event_id));
                }
            }
        }
    }

    Ok(None)
}

struct Candidate {
    event_id: EventId,
    subject_id: SubjectId,
}

fn load_candidates(
    conn: &Connection,
    owner: UserId,
    event_fragment: Option<&str>,
    subject_fragment: Option<&str>,
) -> RepoResult<Vec<Candidate>> {
    let mut sql = String::from(
        "SELECT e.event_id, e.subject_id
         FROM events e
         INNER JOIN subjects s ON s.subject_id = e.subject_id
         WHERE s.owner_id = ?",
    );
    let mut bind_values: Vec<Value> = vec![Value::Integer(owner)];

    if let Some(fragment) = subject_fragment {
        sql.push_str(" AND instr(lower(s.name), lower(?)) > 0");
        bind_values.push(Value::Text(fragment.to_string()));
    }
    if let Some(fragment) = event_fragment {
        sql.push_str(" AND instr(lower(e.name), lower(?)) > 0");
        bind_values.push(Value::Text(fragment.to_string()));
    }

    sql.push_str(" ORDER BY e.event_id ASC;");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut candidates = Vec::new();
    while let Some(row) = rows.next()? {
        candidates.push(Candidate {
            event_id: row.get(0)?,
            subject_id: row.get(1)?,
        });
    }
    Ok(candidates)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|fragment| !fragment.is_empty())
}
