//! Event use-case service.
//!
//! # Responsibility
//! - Event CRUD with ownership enforced transitively through the subject.
//!
//! # Invariants
//! - Creating/listing events requires the parent subject to belong to the
//!   caller; reading/mutating an event checks its subject's owner.

use crate::model::event::{Event, EventDraft, EventId, EventPatch};
use crate::model::subject::SubjectId;
use crate::model::user::UserId;
use crate::model::ValidationError;
use crate::repo::event_repo::{EventListQuery, EventRepository};
use crate::repo::subject_repo::SubjectRepository;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from event use-case operations. Display text is user-facing
/// Spanish for domain failures.
#[derive(Debug)]
pub enum EventServiceError {
    EventNotFound(EventId),
    SubjectNotFound(SubjectId),
    /// Target subject or event belongs to another user.
    NotOwner,
    Validation(ValidationError),
    Repo(RepoError),
}

impl Display for EventServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EventNotFound(id) => write!(f, "evento no encontrado: {id}"),
            Self::SubjectNotFound(id) => write!(f, "materia no encontrada: {id}"),
            Self::NotOwner => write!(f, "no autorizado para acceder a este recurso"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EventServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for EventServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::EventNotFound(id) => Self::EventNotFound(id),
            RepoError::SubjectNotFound(id) => Self::SubjectNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Event service facade over event + subject repositories.
pub struct EventService<E: EventRepository, S: SubjectRepository> {
    events: E,
    subjects: S,
}

impl<E: EventRepository, S: SubjectRepository> EventService<E, S> {
    /// Creates a service using the provided repository implementations.
    pub fn new(events: E, subjects: S) -> Self {
        Self { events, subjects }
    }

    /// Creates an event under a subject owned by the caller.
    pub fn create_event(
        &self,
        owner: UserId,
        draft: &EventDraft,
    ) -> Result<Event, EventServiceError> {
        draft.validate().map_err(EventServiceError::Validation)?;
        self.assert_subject_owned(owner, draft.subject_id)?;
        Ok(self.events.create_event(draft)?)
    }

    /// Gets one event, verifying ownership transitively.
    pub fn get_event(&self, owner: UserId, id: EventId) -> Result<Event, EventServiceError> {
        self.authorized(owner, id)
    }

    /// Lists events under one owned subject.
    pub fn list_events(
        &self,
        owner: UserId,
        subject_id: SubjectId,
        query: &EventListQuery,
    ) -> Result<Vec<Event>, EventServiceError> {
        self.assert_subject_owned(owner, subject_id)?;
        Ok(self.events.list_for_subject(subject_id, query)?)
    }

    /// Lists every event across all subjects of the caller.
    pub fn list_user_events(&self, owner: UserId) -> Result<Vec<Event>, EventServiceError> {
        Ok(self.events.list_for_owner(owner)?)
    }

    /// Applies a partial update to one owned event.
    pub fn update_event(
        &self,
        owner: UserId,
        id: EventId,
        patch: &EventPatch,
    ) -> Result<Event, EventServiceError> {
        self.authorized(owner, id)?;
        patch.validate().map_err(EventServiceError::Validation)?;
        self.events.update_event(id, patch)?;
        self.authorized(owner, id)
    }

    /// Deletes one owned event.
    pub fn delete_event(&self, owner: UserId, id: EventId) -> Result<(), EventServiceError> {
        self.authorized(owner, id)?;
        Ok(self.events.delete_event(id)?)
    }

    fn assert_subject_owned(
        &self,
        owner: UserId,
        subject_id: SubjectId,
    ) -> Result<(), EventServiceError> {
        let subject = self
            .subjects
            .get_subject(subject_id)?
            .ok_or(EventServiceError::SubjectNotFound(subject_id))?;
        if subject.owner_id != owner {
            return Err(EventServiceError::NotOwner);
        }
        Ok(())
    }

    fn authorized(&self, owner: UserId, id: EventId) -> Result<Event, EventServiceError> {
        let event = self
            .events
            .get_event(id)?
            .ok_or(EventServiceError::EventNotFound(id))?;
        self.assert_subject_owned(owner, event.subject_id)
            .map_err(|err| match err {
                // A dangling or foreign subject both mean the caller may not
                // see this event.
                EventServiceError::SubjectNotFound(_) => EventServiceError::NotOwner,
                other => other,
            })?;
        Ok(event)
    }
}
