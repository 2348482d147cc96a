//! User domain model.
//!
//! # Invariants
//! - `email` is stored normalized to lowercase and is unique system-wide.
//! - `password_hash` is opaque to this crate: hashing and verification are
//!   owned by the authentication layer.

use crate::model::{require_text, ValidationError};
use serde::{Deserialize, Serialize};

/// Stable identifier for a registered user.
pub type UserId = i64;

pub const USER_NAME_MAX: usize = 100;
pub const USER_EMAIL_MAX: usize = 150;

/// Color vision profile used by clients to choose accessible palettes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColorVision {
    #[default]
    Normal,
    Protanopia,
    Deuteranopia,
    Tritanopia,
    Protanomaly,
    Deuteranomaly,
    Tritanomaly,
}

impl ColorVision {
    /// Stable string id used in storage and on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Protanopia => "protanopia",
            Self::Deuteranopia => "deuteranopia",
            Self::Tritanopia => "tritanopia",
            Self::Protanomaly => "protanomaly",
            Self::Deuteranomaly => "deuteranomaly",
            Self::Tritanomaly => "tritanomaly",
        }
    }

    /// Parses the storage string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "normal" => Some(Self::Normal),
            "protanopia" => Some(Self::Protanopia),
            "deuteranopia" => Some(Self::Deuteranopia),
            "tritanopia" => Some(Self::Tritanopia),
            "protanomaly" => Some(Self::Protanomaly),
            "deuteranomaly" => Some(Self::Deuteranomaly),
            "tritanomaly" => Some(Self::Tritanomaly),
            _ => None,
        }
    }
}

/// Persisted user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    /// Opaque credential hash; never serialized outward.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub color_vision: ColorVision,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: i64,
}

/// Input for user registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    /// Pre-hashed credential produced by the authentication layer.
    pub password_hash: String,
    pub color_vision: ColorVision,
}

impl UserDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, USER_NAME_MAX)?;
        require_text("email", &self.email, USER_EMAIL_MAX)?;
        if self.password_hash.trim().is_empty() {
            return Err(ValidationError::BlankField("password_hash"));
        }
        Ok(())
    }
}

/// Partial profile update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub color_vision: Option<ColorVision>,
}

impl UserProfilePatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            require_text("name", name, USER_NAME_MAX)?;
        }
        if let Some(email) = &self.email {
            require_text("email", email, USER_EMAIL_MAX)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.color_vision.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::{ColorVision, UserDraft};
    use crate::model::ValidationError;

    fn draft() -> UserDraft {
        UserDraft {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: "pbkdf2$x".to_string(),
            color_vision: ColorVision::Normal,
        }
    }

    #[test]
    fn color_vision_round_trips_through_storage_strings() {
        for profile in [
            ColorVision::Normal,
            ColorVision::Protanopia,
            ColorVision::Deuteranopia,
            ColorVision::Tritanopia,
            ColorVision::Protanomaly,
            ColorVision::Deuteranomaly,
            ColorVision::Tritanomaly,
        ] {
            assert_eq!(ColorVision::parse(profile.as_str()), Some(profile));
        }
        assert_eq!(ColorVision::parse("daltonic"), None);
    }

    #[test]
    fn draft_rejects_blank_name() {
        let mut invalid = draft();
        invalid.name = "   ".to_string();
        assert_eq!(
            invalid.validate().unwrap_err(),
            ValidationError::BlankField("name")
        );
    }

    #[test]
    fn draft_rejects_overlong_email() {
        let mut invalid = draft();
        invalid.email = format!("{}@x.com", "a".repeat(150));
        assert!(matches!(
            invalid.validate().unwrap_err(),
            ValidationError::TooLong { field: "email", .. }
        ));
    }
}
