//! Typed plan actions and their verdict annotations.
//!
//! # Responsibility
//! - Model every supported mutation as an explicit variant with validated
//!   fields, replacing the raw tool-call argument bags.
//! - Pair immutable actions with separate idempotency verdicts.
//!
//! # Invariants
//! - `PlannedAction` is never mutated after the normalizer creates it; the
//!   checker contributes a `PlanVerdict` and both combine into a
//!   `CheckedAction` view.
//! - `seq` is assigned at creation (1-based) and carried through execution;
//!   user-facing numbering never derives from array positions.

use crate::model::event::{EventId, EventStatus};
use crate::model::subject::SubjectId;
use serde::Serialize;
use std::collections::BTreeMap;

/// Explicit 1-based sequence number for user-facing action numbering.
pub type Seq = u32;

/// One validated mutation request, tagged on the wire as `{kind, args}`.
///
/// Event dates are carried as ISO `YYYY-MM-DD` strings: only the
/// idempotency checker and the executor parse them, so a malformed date
/// surfaces as a per-action execution error instead of aborting planning.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "args", rename_all = "snake_case")]
pub enum ActionOp {
    CreateSubject {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    UpdateSubject {
        subject_id: SubjectId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    DeleteSubject {
        subject_id: SubjectId,
    },
    CreateEvent {
        subject_id: SubjectId,
        name: String,
        date: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default)]
        status: EventStatus,
    },
    UpdateEvent {
        event_id: EventId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<EventStatus>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    DeleteEvent {
        event_id: EventId,
    },
}

impl ActionOp {
    /// Stable wire name of this action kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateSubject { .. } => "create_subject",
            Self::UpdateSubject { .. } => "update_subject",
            Self::DeleteSubject { .. } => "delete_subject",
            Self::CreateEvent { .. } => "create_event",
            Self::UpdateEvent { .. } => "update_event",
            Self::DeleteEvent { .. } => "delete_event",
        }
    }
}

/// Immutable action produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedAction {
    pub seq: Seq,
    #[serde(flatten)]
    pub op: ActionOp,
    /// Short user-facing description (Spanish), e.g. `Crear materia 'X'`.
    pub description: String,
}

/// Idempotency/existence verdict contributed by the checker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanVerdict {
    /// Whether the executor may run this action.
    pub allow: bool,
    /// Identifiers resolved during checking (`subject_id`, `event_id`);
    /// `None` marks a lookup that found nothing.
    pub resolved: BTreeMap<&'static str, Option<i64>>,
    /// User-facing reason (Spanish) when `allow` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<String>,
}

impl PlanVerdict {
    pub fn allowed() -> Self {
        Self {
            allow: true,
            resolved: BTreeMap::new(),
            conflict: None,
        }
    }

    pub fn blocked(conflict: impl Into<String>) -> Self {
        Self {
            allow: false,
            resolved: BTreeMap::new(),
            conflict: Some(conflict.into()),
        }
    }

    pub fn with_resolved(mut self, key: &'static str, id: Option<i64>) -> Self {
        self.resolved.insert(key, id);
        self
    }
}

/// Read-only view combining an action with its verdict; this is what the
/// executor consumes and what plans serialize as.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckedAction {
    #[serde(flatten)]
    pub action: PlannedAction,
    #[serde(flatten)]
    pub verdict: PlanVerdict,
}

impl CheckedAction {
    pub fn seq(&self) -> Seq {
        self.action.seq
    }

    pub fn op(&self) -> &ActionOp {
        &self.action.op
    }
}

/// Outcome of one planning pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanResult {
    /// Checked actions in tool-call input order.
    pub actions: Vec<CheckedAction>,
    /// Normalization errors (Spanish), one per failed expansion.
    pub errors: Vec<String>,
    /// Human-readable explanation of the whole plan (Spanish).
    pub summary: String,
}

impl PlanResult {
    /// Number of actions the executor would actually run.
    pub fn executable_count(&self) -> usize {
        self.actions.iter().filter(|action| action.verdict.allow).count()
    }
}
