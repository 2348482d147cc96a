//! Event (evento) domain model.
//!
//! # Invariants
//! - An event belongs to exactly one subject; ownership is transitive
//!   through the subject's owner.
//! - `(subject_id, name, date)` is the natural key used for idempotency
//!   decisions.

use crate::model::subject::SubjectId;
use crate::model::{limit_text, require_text, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Stable identifier for an event.
pub type EventId = i64;

pub const EVENT_NAME_MAX: usize = 150;
pub const EVENT_DESCRIPTION_MAX: usize = 255;

/// Review state of an academic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl EventStatus {
    /// Stable string id used in storage and on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses the storage string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Persisted event record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    pub subject_id: SubjectId,
    pub name: String,
    pub description: Option<String>,
    /// Calendar date in ISO `YYYY-MM-DD` form.
    pub date: NaiveDate,
    pub status: EventStatus,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: i64,
}

/// Input for event creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub subject_id: SubjectId,
    pub name: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub status: EventStatus,
}

impl EventDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, EVENT_NAME_MAX)?;
        if let Some(description) = &self.description {
            limit_text("description", description, EVENT_DESCRIPTION_MAX)?;
        }
        Ok(())
    }
}

/// Partial event update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub status: Option<EventStatus>,
}

impl EventPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            require_text("name", name, EVENT_NAME_MAX)?;
        }
        if let Some(description) = &self.description {
            limit_text("description", description, EVENT_DESCRIPTION_MAX)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.status.is_none()
    }
}
