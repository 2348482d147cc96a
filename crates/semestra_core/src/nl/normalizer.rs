//! Tool-call normalization: raw argument bags to typed planned actions.
//!
//! # Responsibility
//! - Convert one untrusted tool call into zero or more validated actions,
//!   resolving name references and enforcing ownership immediately.
//! - Degrade every domain failure to an error string; only infrastructure
//!   errors propagate.
//!
//! # Invariants
//! - A tool call that expands to zero actions (all-error) never interrupts
//!   processing of the remaining batch.
//! - A resolved-but-foreign resource produces an error, not a silent skip.
//! - Date values are carried as unparsed ISO strings; parsing is deferred to
//!   the checker/executor.

use crate::model::event::EventStatus;
use crate::model::user::UserId;
use crate::nl::action::{ActionOp, PlannedAction, Seq};
use crate::nl::adapter::ToolCall;
use crate::nl::guard::{assert_event_owned, assert_subject_owned, GuardError};
use crate::nl::resolver::{resolve_event_ref, resolve_subject_ref};
use crate::repo::{RepoError, RepoResult};
use rusqlite::Connection;
use serde_json::{Map, Value};

/// Normalizes one tool call into planned actions and/or error strings.
///
/// `seq` is the shared plan-wide sequence counter; every produced action is
/// stamped at creation.
pub fn normalize_tool_call(
    conn: &Connection,
    owner: UserId,
    call: &ToolCall,
    seq: &mut Seq,
) -> RepoResult<(Vec<PlannedAction>, Vec<String>)> {
    let mut actions = Vec::new();
    let mut errors = Vec::new();

    let outcome = match call.name.as_str() {
        "create_subject" => normalize_create_subject(&call.args),
        "update_subject" => normalize_update_subject(conn, owner, &call.args),
        "delete_subject" => normalize_delete_subject(conn, owner, &call.args),
        "create_event" => normalize_create_event(conn, owner, &call.args),
        "update_event" => normalize_update_event(conn, owner, &call.args),
        "delete_event" => normalize_delete_event(conn, owner, &call.args),
        other => Err(NormalizeFail::User(format!(
            "herramienta desconocida: {other}"
        ))),
    };

    match outcome {
        Ok((op, description)) => {
            *seq += 1;
            actions.push(PlannedAction {
                seq: *seq,
                op,
                description,
            });
        }
        Err(NormalizeFail::User(message)) => errors.push(message),
        Err(NormalizeFail::Infra(err)) => return Err(err),
    }

    Ok((actions, errors))
}

/// Normalization failure: either a per-action user-facing error (Spanish)
/// or an infrastructure error that must propagate.
enum NormalizeFail {
    User(String),
    Infra(RepoError),
}

impl From<String> for NormalizeFail {
    fn from(value: String) -> Self {
        Self::User(value)
    }
}

impl From<RepoError> for NormalizeFail {
    fn from(value: RepoError) -> Self {
        Self::Infra(value)
    }
}

type Normalized = Result<(ActionOp, String), NormalizeFail>;

fn normalize_create_subject(args: &Map<String, Value>) -> Normalized {
    let name = required_text(args, "name", "create_subject")?;
    let description = optional_text(args, "description")?;
    let display = name.clone();
    Ok((
        ActionOp::CreateSubject { name, description },
        format!("Crear materia '{display}'"),
    ))
}

fn normalize_update_subject(
    conn: &Connection,
    owner: UserId,
    args: &Map<String, Value>,
) -> Normalized {
    let subject_id = subject_target(conn, owner, args, "update_subject")?;
    guard_subject(conn, owner, subject_id, "update_subject")?;

    let name = optional_text(args, "name")?;
    let description = optional_text(args, "description")?;
    Ok((
        ActionOp::UpdateSubject {
            subject_id,
            name,
            description,
        },
        format!("Actualizar materia #{subject_id}"),
    ))
}

fn normalize_delete_subject(
    conn: &Connection,
    owner: UserId,
    args: &Map<String, Value>,
) -> Normalized {
    let subject_id = subject_target(conn, owner, args, "delete_subject")?;
    guard_subject(conn, owner, subject_id, "delete_subject")?;

    Ok((
        ActionOp::DeleteSubject { subject_id },
        format!("Eliminar materia #{subject_id}"),
    ))
}

fn normalize_create_event(
    conn: &Connection,
    owner: UserId,
    args: &Map<String, Value>,
) -> Normalized {
    let subject_id = subject_target(conn, owner, args, "create_event")?;
    guard_subject(conn, owner, subject_id, "create_event")?;

    let name = required_text(args, "name", "create_event")?;
    let date = required_text(args, "date", "create_event")?;
    let description = optional_text(args, "description")?;
    let status = optional_status(args)?.unwrap_or_default();
    let display = name.clone();
    let display_date = date.clone();
    Ok((
        ActionOp::CreateEvent {
            subject_id,
            name,
            date,
            description,
            status,
        },
        format!("Crear evento '{display}' ({display_date}) en materia #{subject_id}"),
    ))
}

fn normalize_update_event(
    conn: &Connection,
    owner: UserId,
    args: &Map<String, Value>,
) -> Normalized {
    let event_id = event_target(conn, owner, args, "update_event")?;
    guard_event(conn, owner, event_id, "update_event")?;

    let name = optional_text(args, "name")?;
    let date = optional_text(args, "date")?;
    let status = optional_status(args)?;
    let description = optional_text(args, "description")?;
    Ok((
        ActionOp::UpdateEvent {
            event_id,
            name,
            date,
            status,
            description,
        },
        format!("Actualizar evento #{event_id}"),
    ))
}

fn normalize_delete_event(
    conn: &Connection,
    owner: UserId,
    args: &Map<String, Value>,
) -> Normalized {
    let event_id = event_target(conn, owner, args, "delete_event")?;
    guard_event(conn, owner, event_id, "delete_event")?;

    Ok((
        ActionOp::DeleteEvent { event_id },
        format!("Eliminar evento #{event_id}"),
    ))
}

/// Resolves the target subject id from `subject_id` or `subject_ref`.
fn subject_target(
    conn: &Connection,
    owner: UserId,
    args: &Map<String, Value>,
    tool: &str,
) -> Result<i64, NormalizeFail> {
    if let Some(id) = optional_id(args, "subject_id")? {
        return Ok(id);
    }

    match optional_text(args, "subject_ref")? {
        Some(reference) => match resolve_subject_ref(conn, owner, &reference)? {
            Some(id) => Ok(id),
            None => Err(format!("no se encontró la materia '{reference}'").into()),
        },
        None => Err(format!("falta `subject_id`/`subject_ref` en {tool}").into()),
    }
}

/// Resolves the target event id from `event_id` or name references.
fn event_target(
    conn: &Connection,
    owner: UserId,
    args: &Map<String, Value>,
    tool: &str,
) -> Result<i64, NormalizeFail> {
    if let Some(id) = optional_id(args, "event_id")? {
        return Ok(id);
    }

    let event_ref = optional_text(args, "event_ref")?;
    let subject_ref = optional_text(args, "subject_ref")?;
    if event_ref.is_none() && subject_ref.is_none() {
        return Err(format!("falta `event_id`/`event_ref` en {tool}").into());
    }

    match resolve_event_ref(conn, owner, event_ref.as_deref(), subject_ref.as_deref())? {
        Some(id) => Ok(id),
        None => Err(match (&event_ref, &subject_ref) {
            (Some(event), _) => format!("no se encontró un evento único para '{event}'"),
            (None, Some(subject)) => {
                format!("no se encontró un evento único en la materia '{subject}'")
            }
            (None, None) => unreachable!("at least one reference is present"),
        }
        .into()),
    }
}

fn guard_subject(
    conn: &Connection,
    owner: UserId,
    subject_id: i64,
    tool: &str,
) -> Result<(), NormalizeFail> {
    match assert_subject_owned(conn, owner, subject_id) {
        Ok(_) => Ok(()),
        Err(GuardError::Repo(err)) => Err(err.into()),
        Err(err) => Err(format!("{tool}: {err}").into()),
    }
}

fn guard_event(
    conn: &Connection,
    owner: UserId,
    event_id: i64,
    tool: &str,
) -> Result<(), NormalizeFail> {
    match assert_event_owned(conn, owner, event_id) {
        Ok(_) => Ok(()),
        Err(GuardError::Repo(err)) => Err(err.into()),
        Err(err) => Err(format!("{tool}: {err}").into()),
    }
}

// ---- untrusted argument extraction -------------------------------------

fn optional_text(args: &Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        Some(_) => Err(format!("el campo `{key}` debe ser texto")),
    }
}

fn required_text(args: &Map<String, Value>, key: &str, tool: &str) -> Result<String, String> {
    optional_text(args, key)?.ok_or_else(|| format!("falta `{key}` en {tool}"))
}

fn optional_id(args: &Map<String, Value>, key: &str) -> Result<Option<i64>, String> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number
            .as_i64()
            .filter(|id| *id > 0)
            .map(Some)
            .ok_or_else(|| format!("el campo `{key}` debe ser un id positivo")),
        Some(Value::String(text)) => match text.trim().parse::<i64>() {
            Ok(id) if id > 0 => Ok(Some(id)),
            _ => Err(format!("el campo `{key}` debe ser un id positivo")),
        },
        Some(_) => Err(format!("el campo `{key}` debe ser un id positivo")),
    }
}

fn optional_status(args: &Map<String, Value>) -> Result<Option<EventStatus>, String> {
    match optional_text(args, "status")? {
        None => Ok(None),
        Some(text) => EventStatus::parse(&text).map(Some).ok_or_else(|| {
            format!("estado inválido '{text}'; se espera pending|approved|rejected")
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{optional_id, optional_status, optional_text};
    use crate::model::event::EventStatus;
    use serde_json::json;

    fn args(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn optional_text_trims_and_treats_blank_as_missing() {
        let bag = args(json!({"name": "  Física  ", "description": "   "}));
        assert_eq!(
            optional_text(&bag, "name").unwrap().as_deref(),
            Some("Física")
        );
        assert_eq!(optional_text(&bag, "description").unwrap(), None);
        assert_eq!(optional_text(&bag, "missing").unwrap(), None);
    }

    #[test]
    fn optional_text_rejects_non_string_values() {
        let bag = args(json!({"name": 42}));
        let err = optional_text(&bag, "name").unwrap_err();
        assert!(err.contains("`name`"));
    }

    #[test]
    fn optional_id_accepts_numbers_and_numeric_strings() {
        let bag = args(json!({"a": 7, "b": "12", "c": -1, "d": true}));
        assert_eq!(optional_id(&bag, "a").unwrap(), Some(7));
        assert_eq!(optional_id(&bag, "b").unwrap(), Some(12));
        assert!(optional_id(&bag, "c").is_err());
        assert!(optional_id(&bag, "d").is_err());
    }

    #[test]
    fn optional_status_parses_known_states_only() {
        let bag = args(json!({"status": "approved"}));
        assert_eq!(
            optional_status(&bag).unwrap(),
            Some(EventStatus::Approved)
        );

        let bad = args(json!({"status": "done"}));
        let err = optional_status(&bad).unwrap_err();
        assert!(err.contains("estado inválido"));
    }
}
