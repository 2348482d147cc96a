//! Subject use-case service.
//!
//! # Responsibility
//! - Subject CRUD scoped to the authenticated owner.
//! - Enforce the per-owner name uniqueness rule above the repository.
//!
//! # Invariants
//! - Every operation verifies the target subject belongs to the caller.
//! - Duplicate checks compare trimmed names exactly, excluding the target
//!   subject itself on renames.

use crate::model::subject::{Subject, SubjectDraft, SubjectId, SubjectPatch};
use crate::model::user::UserId;
use crate::model::ValidationError;
use crate::repo::subject_repo::{SubjectListQuery, SubjectRepository};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from subject use-case operations. Display text is user-facing
/// Spanish for domain failures.
#[derive(Debug)]
pub enum SubjectServiceError {
    SubjectNotFound(SubjectId),
    /// Subject exists but belongs to another user.
    NotOwner(SubjectId),
    /// The owner already has a subject with this name.
    DuplicateName(String),
    Validation(ValidationError),
    Repo(RepoError),
}

impl Display for SubjectServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SubjectNotFound(id) => write!(f, "materia no encontrada: {id}"),
            Self::NotOwner(id) => {
                write!(f, "no autorizado para acceder a la materia {id}")
            }
            Self::DuplicateName(name) => {
                write!(f, "ya existe una materia con el nombre '{name}'")
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SubjectServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for SubjectServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::SubjectNotFound(id) => Self::SubjectNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Subject service facade over repository implementations.
pub struct SubjectService<R: SubjectRepository> {
    repo: R,
}

impl<R: SubjectRepository> SubjectService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a subject for the owner, rejecting duplicate names.
    pub fn create_subject(
        &self,
        owner: UserId,
        draft: &SubjectDraft,
    ) -> Result<Subject, SubjectServiceError> {
        draft.validate().map_err(SubjectServiceError::Validation)?;

        let name = draft.name.trim();
        if self.repo.find_by_owner_and_name(owner, name)?.is_some() {
            return Err(SubjectServiceError::DuplicateName(name.to_string()));
        }

        Ok(self.repo.create_subject(owner, draft)?)
    }

    /// Gets one subject, verifying ownership.
    pub fn get_subject(
        &self,
        owner: UserId,
        id: SubjectId,
    ) -> Result<Subject, SubjectServiceError> {
        self.authorized(owner, id)
    }

    /// Lists the owner's subjects with optional substring filter.
    pub fn list_subjects(
        &self,
        owner: UserId,
        query: &SubjectListQuery,
    ) -> Result<Vec<Subject>, SubjectServiceError> {
        Ok(self.repo.list_subjects(owner, query)?)
    }

    /// Applies a partial update, re-checking duplicates on rename.
    pub fn update_subject(
        &self,
        owner: UserId,
        id: SubjectId,
        patch: &SubjectPatch,
    ) -> Result<Subject, SubjectServiceError> {
        self.authorized(owner, id)?;
        patch.validate().map_err(SubjectServiceError::Validation)?;

        if let Some(new_name) = patch.name.as_deref().map(str::trim) {
            if let Some(existing) = self.repo.find_by_owner_and_name(owner, new_name)? {
                if existing.subject_id != id {
                    return Err(SubjectServiceError::DuplicateName(new_name.to_string()));
                }
            }
        }

        self.repo.update_subject(id, patch)?;
        self.authorized(owner, id)
    }

    /// Deletes one subject (owned events are removed by FK cascade).
    pub fn delete_subject(
        &self,
        owner: UserId,
        id: SubjectId,
    ) -> Result<(), SubjectServiceError> {
        self.authorized(owner, id)?;
        Ok(self.repo.delete_subject(id)?)
    }

    fn authorized(&self, owner: UserId, id: SubjectId) -> Result<Subject, SubjectServiceError> {
        let subject = self
            .repo
            .get_subject(id)?
            .ok_or(SubjectServiceError::SubjectNotFound(id))?;
        if subject.owner_id != owner {
            return Err(SubjectServiceError::NotOwner(id));
        }
        Ok(subject)
    }
}
