//! Subject (materia) domain model.
//!
//! # Invariants
//! - A subject belongs to exactly one owner.
//! - `(owner_id, name)` is the natural key used for idempotency decisions;
//!   uniqueness is enforced by the service layer, not by the schema.

use crate::model::user::UserId;
use crate::model::{require_text, ValidationError};
use serde::{Deserialize, Serialize};

/// Stable identifier for a subject.
pub type SubjectId = i64;

pub const SUBJECT_NAME_MAX: usize = 100;

/// Persisted subject record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub subject_id: SubjectId,
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: i64,
}

/// Input for subject creation. The owner is supplied separately by the
/// caller holding the authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectDraft {
    pub name: String,
    pub description: Option<String>,
}

impl SubjectDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, SUBJECT_NAME_MAX)
    }
}

/// Partial subject update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl SubjectPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            require_text("name", name, SUBJECT_NAME_MAX)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::{SubjectDraft, SubjectPatch};
    use crate::model::ValidationError;

    #[test]
    fn draft_rejects_blank_and_overlong_names() {
        assert_eq!(
            SubjectDraft::new("  ").validate().unwrap_err(),
            ValidationError::BlankField("name")
        );
        assert!(matches!(
            SubjectDraft::new("x".repeat(101)).validate().unwrap_err(),
            ValidationError::TooLong {
                field: "name",
                max: 100
            }
        ));
        assert!(SubjectDraft::new("Álgebra").validate().is_ok());
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(SubjectPatch::default().is_empty());
        let patch = SubjectPatch {
            name: Some("Análisis".to_string()),
            ..SubjectPatch::default()
        };
        assert!(!patch.is_empty());
    }
}
