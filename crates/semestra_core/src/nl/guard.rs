//! Ownership guard: the authorization boundary of the command pipeline.
//!
//! # Responsibility
//! - Verify that a subject or event belongs (directly or transitively) to
//!   the requesting user before an action may be marked allowed.
//!
//! # Invariants
//! - `NotFound` and `NotOwner` are distinct outcomes: a resource owned by
//!   someone else is never reported as missing.

use crate::model::event::{Event, EventId};
use crate::model::subject::{Subject, SubjectId};
use crate::model::user::UserId;
use crate::repo::event_repo::{EventRepository, SqliteEventRepository};
use crate::repo::subject_repo::{SqliteSubjectRepository, SubjectRepository};
use crate::repo::RepoError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Authorization failure. Display text is user-facing Spanish.
#[derive(Debug)]
pub enum GuardError {
    SubjectNotFound(SubjectId),
    EventNotFound(EventId),
    /// Resource exists but belongs to another user.
    NotOwner,
    Repo(RepoError),
}

impl Display for GuardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SubjectNotFound(id) => write!(f, "materia no encontrada: {id}"),
            Self::EventNotFound(id) => write!(f, "evento no encontrado: {id}"),
            Self::NotOwner => write!(f, "no autorizado para acceder a este recurso"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GuardError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for GuardError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Asserts the subject exists and belongs to `owner`, returning it.
pub fn assert_subject_owned(
    conn: &Connection,
    owner: UserId,
    subject_id: SubjectId,
) -> Result<Subject, GuardError> {
    let repo = SqliteSubjectRepository::try_new(conn)?;
    let subject = repo
        .get_subject(subject_id)?
        .ok_or(GuardError::SubjectNotFound(subject_id))?;
    if subject.owner_id != owner {
        return Err(GuardError::NotOwner);
    }
    Ok(subject)
}

/// Asserts the event exists and belongs to `owner` through its subject.
pub fn assert_event_owned(
    conn: &Connection,
    owner: UserId,
    event_id: EventId,
) -> Result<Event, GuardError> {
    let repo = SqliteEventRepository::try_new(conn)?;
    let event = repo
        .get_event(event_id)?
        .ok_or(GuardError::EventNotFound(event_id))?;
    assert_subject_owned(conn, owner, event.subject_id).map_err(|err| match err {
        // A dangling subject row means the caller may not see this event.
        GuardError::SubjectNotFound(_) => GuardError::NotOwner,
        other => other,
    })?;
    Ok(event)
}
