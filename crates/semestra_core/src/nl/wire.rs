//! Wire forms of plans and execution results.
//!
//! # Responsibility
//! - Serialize plans/results under the external API contract.
//! - Re-validate action lists replayed by clients, treating them as
//!   untrusted input.
//!
//! # Invariants
//! - Replayed items must carry `kind` and `args`; violations fail with an
//!   error naming the offending (1-based) action index.
//! - Replay validation is structural only: ownership and existence are
//!   re-verified by the executor's domain services.

use crate::nl::action::{ActionOp, CheckedAction, PlanResult, PlanVerdict, PlannedAction, Seq};
use crate::nl::executor::ExecutionReport;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Replay validation failure; `index` is 0-based, display is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub index: usize,
    pub message: String,
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "acción #{} inválida: {}", self.index + 1, self.message)
    }
}

impl Error for DecodeError {}

/// Serializes a plan as `{summary, actions}` per the API contract.
pub fn serialize_plan(plan: &PlanResult) -> Value {
    json!({
        "summary": &plan.summary,
        "actions": &plan.actions,
    })
}

/// Serializes execution results as a flat record list, with a trailing
/// `execution_summary` record when the batch reported totals.
pub fn execution_records(report: &ExecutionReport) -> Vec<Value> {
    let mut records: Vec<Value> = report
        .results
        .iter()
        .map(|result| serde_json::to_value(result).unwrap_or_else(|_| Value::Null))
        .collect();

    if let Some(summary) = &report.summary {
        records.push(json!({
            "kind": "execution_summary",
            "total": summary.total,
            "success": summary.success,
            "error": summary.error,
            "skipped": summary.skipped,
        }));
    }

    records
}

/// Decodes a client-replayed action list back into checked actions.
///
/// `kind` and `args` are required; `description`, `allow`, `resolved`,
/// `conflict` and `seq` are optional with replay-friendly defaults
/// (`allow = true`, `seq` = list position).
pub fn decode_actions(items: &[Value]) -> Result<Vec<CheckedAction>, DecodeError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| decode_action(index, item))
        .collect()
}

fn decode_action(index: usize, item: &Value) -> Result<CheckedAction, DecodeError> {
    let fail = |message: String| DecodeError { index, message };

    let object = item
        .as_object()
        .ok_or_else(|| fail("debe ser un objeto".to_string()))?;

    let kind = object
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| fail("falta `kind`".to_string()))?;
    let args = object
        .get("args")
        .and_then(Value::as_object)
        .ok_or_else(|| fail("falta `args`".to_string()))?;

    let op: ActionOp = serde_json::from_value(json!({ "kind": kind, "args": args }))
        .map_err(|err| fail(format!("argumentos inválidos para `{kind}`: {err}")))?;

    let description = object
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let allow = object.get("allow").and_then(Value::as_bool).unwrap_or(true);
    let conflict = object
        .get("conflict")
        .and_then(Value::as_str)
        .map(str::to_string);
    let seq = object
        .get("seq")
        .and_then(Value::as_u64)
        .map(|value| value as Seq)
        .unwrap_or((index + 1) as Seq);

    let resolved = object
        .get("resolved")
        .and_then(Value::as_object)
        .map(decode_resolved)
        .unwrap_or_default();

    Ok(CheckedAction {
        action: PlannedAction {
            seq,
            op,
            description,
        },
        verdict: PlanVerdict {
            allow,
            resolved,
            conflict,
        },
    })
}

fn decode_resolved(object: &Map<String, Value>) -> BTreeMap<&'static str, Option<i64>> {
    let mut resolved = BTreeMap::new();
    for key in ["subject_id", "event_id"] {
        if let Some(value) = object.get(key) {
            resolved.insert(key, value.as_i64());
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::{decode_actions, DecodeError};
    use crate::nl::action::ActionOp;
    use serde_json::json;

    #[test]
    fn decode_accepts_minimal_items_with_defaults() {
        let items = vec![json!({
            "kind": "delete_event",
            "args": {"event_id": 9}
        })];
        let actions = decode_actions(&items).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].seq(), 1);
        assert!(actions[0].verdict.allow);
        assert_eq!(
            actions[0].op(),
            &ActionOp::DeleteEvent { event_id: 9 }
        );
    }

    #[test]
    fn decode_reports_offending_index_for_missing_kind() {
        let items = vec![
            json!({"kind": "delete_subject", "args": {"subject_id": 1}}),
            json!({"args": {"subject_id": 2}}),
        ];
        let err = decode_actions(&items).unwrap_err();
        assert_eq!(
            err,
            DecodeError {
                index: 1,
                message: "falta `kind`".to_string()
            }
        );
        assert!(err.to_string().contains("acción #2"));
    }

    #[test]
    fn decode_rejects_unknown_kind() {
        let items = vec![json!({"kind": "drop_database", "args": {}})];
        let err = decode_actions(&items).unwrap_err();
        assert_eq!(err.index, 0);
        assert!(err.message.contains("drop_database"));
    }

    #[test]
    fn decode_preserves_blocked_verdicts() {
        let items = vec![json!({
            "kind": "create_subject",
            "args": {"name": "Historia"},
            "allow": false,
            "conflict": "La materia ya existe; solo se permite update/delete.",
            "resolved": {"subject_id": 4},
            "seq": 3
        })];
        let actions = decode_actions(&items).unwrap();
        assert!(!actions[0].verdict.allow);
        assert_eq!(actions[0].seq(), 3);
        assert_eq!(
            actions[0].verdict.resolved.get("subject_id"),
            Some(&Some(4))
        );
    }
}
