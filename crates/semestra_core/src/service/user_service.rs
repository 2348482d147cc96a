//! User use-case service.
//!
//! # Responsibility
//! - Registration and profile updates with email uniqueness enforcement.
//!
//! # Invariants
//! - Emails are normalized (trim + lowercase) before persistence.
//! - `password_hash` is treated as opaque text; hashing lives outside core.

use crate::model::user::{User, UserDraft, UserId, UserProfilePatch};
use crate::model::ValidationError;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from user use-case operations. Display text is user-facing
/// Spanish for domain failures.
#[derive(Debug)]
pub enum UserServiceError {
    UserNotFound(UserId),
    /// Another account already uses the given email.
    DuplicateEmail(String),
    Validation(ValidationError),
    Repo(RepoError),
}

impl Display for UserServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserNotFound(id) => write!(f, "usuario no encontrado: {id}"),
            Self::DuplicateEmail(email) => {
                write!(f, "ya existe un usuario con el email '{email}'")
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for UserServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for UserServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::UserNotFound(id) => Self::UserNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// User service facade over repository implementations.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a new user with normalized name/email.
    pub fn register_user(&self, draft: UserDraft) -> Result<User, UserServiceError> {
        let normalized = UserDraft {
            name: draft.name.trim().to_string(),
            email: normalize_email(&draft.email),
            password_hash: draft.password_hash,
            color_vision: draft.color_vision,
        };
        normalized.validate().map_err(UserServiceError::Validation)?;

        if self.repo.email_in_use(&normalized.email, None)? {
            return Err(UserServiceError::DuplicateEmail(normalized.email));
        }

        Ok(self.repo.create_user(&normalized)?)
    }

    /// Gets one user by id.
    pub fn get_user(&self, id: UserId) -> Result<User, UserServiceError> {
        self.repo
            .get_user(id)?
            .ok_or(UserServiceError::UserNotFound(id))
    }

    /// Applies a partial profile update and returns the updated record.
    pub fn update_profile(
        &self,
        id: UserId,
        patch: UserProfilePatch,
    ) -> Result<User, UserServiceError> {
        let normalized = UserProfilePatch {
            name: patch.name.map(|name| name.trim().to_string()),
            email: patch.email.map(|email| normalize_email(&email)),
            color_vision: patch.color_vision,
        };
        normalized.validate().map_err(UserServiceError::Validation)?;

        if let Some(email) = &normalized.email {
            if self.repo.email_in_use(email, Some(id))? {
                return Err(UserServiceError::DuplicateEmail(email.clone()));
            }
        }

        self.repo.update_profile(id, &normalized)?;
        self.get_user(id)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
