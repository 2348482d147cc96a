//! Core domain logic for Semestra, an academic agenda with
//! natural-language commands.
//!
//! This crate is the single source of truth for business invariants: user,
//! subject and event CRUD, plus the command-planning pipeline that turns
//! LLM-extracted tool calls into safe, idempotent, ownership-checked
//! mutations.

pub mod db;
pub mod logging;
pub mod model;
pub mod nl;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::event::{Event, EventDraft, EventId, EventPatch, EventStatus};
pub use model::subject::{Subject, SubjectDraft, SubjectId, SubjectPatch};
pub use model::user::{ColorVision, User, UserDraft, UserId, UserProfilePatch};
pub use model::ValidationError;
pub use nl::{
    decode_actions, execute_actions, plan_from_text, plan_tool_calls, serialize_plan, ActionOp,
    CheckedAction, ExecutionReport, ExecutionResult, ExecutionStatus, LlmAdapter, PlanResult,
    ToolCall,
};
pub use repo::event_repo::{EventListQuery, EventRepository, SqliteEventRepository};
pub use repo::subject_repo::{SqliteSubjectRepository, SubjectListQuery, SubjectRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::event_service::{EventService, EventServiceError};
pub use service::subject_service::{SubjectService, SubjectServiceError};
pub use service::user_service::{UserService, UserServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
