use rusqlite::Connection;
use semestra_core::db::open_db_in_memory;
use semestra_core::nl::wire::{decode_actions, execution_records, serialize_plan};
use semestra_core::{
    execute_actions, plan_tool_calls, ColorVision, ExecutionStatus, SqliteSubjectRepository,
    SqliteUserRepository, SubjectDraft, SubjectId, SubjectService, ToolCall, UserDraft, UserId,
    UserService,
};
use serde_json::json;

fn register_user(conn: &Connection, email: &str) -> UserId {
    let users = UserService::new(SqliteUserRepository::try_new(conn).unwrap());
    users
        .register_user(UserDraft {
            name: "Estudiante".to_string(),
            email: email.to_string(),
            password_hash: "pbkdf2$stub".to_string(),
            color_vision: ColorVision::Normal,
        })
        .unwrap()
        .user_id
}

fn create_subject(conn: &Connection, owner: UserId, name: &str) -> SubjectId {
    let subjects = SubjectService::new(SqliteSubjectRepository::try_new(conn).unwrap());
    subjects
        .create_subject(owner, &SubjectDraft::new(name))
        .unwrap()
        .subject_id
}

fn call(name: &str, args: serde_json::Value) -> ToolCall {
    ToolCall::new(name, args.as_object().unwrap().clone())
}

fn subject_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM subjects;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn planned_create_executes_and_returns_the_new_subject() {
    let conn = open_db_in_memory().unwrap();
    let owner = register_user(&conn, "ana@example.com");

    let plan = plan_tool_calls(
        &conn,
        owner,
        &[call("create_subject", json!({"name": "Historia"}))],
    )
    .unwrap();
    let report = execute_actions(&conn, owner, &plan.actions);

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].status, ExecutionStatus::Success);
    assert!(report.summary.is_none());

    let record = serde_json::to_value(&report.results[0]).unwrap();
    assert_eq!(record["kind"], "create_subject");
    assert_eq!(record["status"], "success");
    assert_eq!(record["materia"]["name"], "Historia");
    assert!(record["materia"]["subject_id"].as_i64().unwrap() > 0);

    assert_eq!(subject_count(&conn), 1);
}

#[test]
fn blocked_actions_are_skipped_with_their_conflict_reason() {
    let conn = open_db_in_memory().unwrap();
    let owner = register_user(&conn, "ana@example.com");
    create_subject(&conn, owner, "Historia");

    let plan = plan_tool_calls(
        &conn,
        owner,
        &[call("create_subject", json!({"name": "Historia"}))],
    )
    .unwrap();
    assert!(!plan.actions[0].verdict.allow);

    let report = execute_actions(&conn, owner, &plan.actions);
    assert_eq!(report.results[0].status, ExecutionStatus::Skipped);

    let record = serde_json::to_value(&report.results[0]).unwrap();
    assert!(record["error"].as_str().unwrap().contains("ya existe"));

    // No second subject was created.
    assert_eq!(subject_count(&conn), 1);
}

#[test]
fn one_failing_action_never_aborts_its_siblings() {
    let conn = open_db_in_memory().unwrap();
    let owner = register_user(&conn, "ana@example.com");

    // Replayed action list: the middle delete targets a missing event, the
    // two creates around it must still commit.
    let actions = decode_actions(&[
        json!({"kind": "create_subject", "args": {"name": "Historia"}}),
        json!({"kind": "delete_event", "args": {"event_id": 999}}),
        json!({"kind": "create_subject", "args": {"name": "Química"}}),
    ])
    .unwrap();

    let report = execute_actions(&conn, owner, &actions);

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.results[0].status, ExecutionStatus::Success);
    assert_eq!(report.results[1].status, ExecutionStatus::Error);
    assert_eq!(report.results[2].status, ExecutionStatus::Success);

    let failed = serde_json::to_value(&report.results[1]).unwrap();
    assert!(failed["error"].as_str().unwrap().contains("evento no encontrado"));

    assert_eq!(subject_count(&conn), 2);

    let summary = report.summary.unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.success, 2);
    assert_eq!(summary.error, 1);
    assert_eq!(summary.skipped, 0);
}

#[test]
fn execution_results_keep_plan_order_and_sequence_numbers() {
    let conn = open_db_in_memory().unwrap();
    let owner = register_user(&conn, "ana@example.com");

    let plan = plan_tool_calls(
        &conn,
        owner,
        &[
            call("create_subject", json!({"name": "A"})),
            call("create_subject", json!({"name": "B"})),
            call("create_subject", json!({"name": "C"})),
        ],
    )
    .unwrap();
    let report = execute_actions(&conn, owner, &plan.actions);

    let seqs: Vec<u32> = report.results.iter().map(|result| result.seq).collect();
    assert_eq!(seqs, [1, 2, 3]);
}

#[test]
fn serialized_plan_round_trips_through_execution() {
    let conn = open_db_in_memory().unwrap();
    let owner = register_user(&conn, "ana@example.com");
    let fisica = create_subject(&conn, owner, "Física");

    let plan = plan_tool_calls(
        &conn,
        owner,
        &[
            call("create_subject", json!({"name": "Historia"})),
            call(
                "create_event",
                json!({"subject_id": fisica, "name": "Parcial", "date": "2026-06-15"}),
            ),
        ],
    )
    .unwrap();

    // Client receives the serialized plan and posts the actions back.
    let wire = serialize_plan(&plan);
    let replayed = decode_actions(wire["actions"].as_array().unwrap()).unwrap();
    assert_eq!(replayed, plan.actions);

    let report = execute_actions(&conn, owner, &replayed);
    assert!(report
        .results
        .iter()
        .all(|result| result.status == ExecutionStatus::Success));

    assert_eq!(subject_count(&conn), 2);
    let events: i64 = conn
        .query_row("SELECT COUNT(*) FROM events;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(events, 1);
}

#[test]
fn replayed_foreign_actions_fail_at_execution() {
    let conn = open_db_in_memory().unwrap();
    let ana = register_user(&conn, "ana@example.com");
    let bruno = register_user(&conn, "bruno@example.com");
    let secret = create_subject(&conn, ana, "Química");

    // A tampered replay claiming allow=true cannot bypass the services'
    // ownership re-check.
    let actions = decode_actions(&[json!({
        "kind": "delete_subject",
        "args": {"subject_id": secret},
        "allow": true
    })])
    .unwrap();

    let report = execute_actions(&conn, bruno, &actions);
    assert_eq!(report.results[0].status, ExecutionStatus::Error);
    let record = serde_json::to_value(&report.results[0]).unwrap();
    assert!(record["error"].as_str().unwrap().contains("no autorizado"));

    assert_eq!(subject_count(&conn), 1);
}

#[test]
fn invalid_replayed_date_surfaces_as_a_per_action_error() {
    let conn = open_db_in_memory().unwrap();
    let owner = register_user(&conn, "ana@example.com");
    let fisica = create_subject(&conn, owner, "Física");

    let actions = decode_actions(&[json!({
        "kind": "create_event",
        "args": {"subject_id": fisica, "name": "Parcial", "date": "mañana"}
    })])
    .unwrap();

    let report = execute_actions(&conn, owner, &actions);
    assert_eq!(report.results[0].status, ExecutionStatus::Error);
    let record = serde_json::to_value(&report.results[0]).unwrap();
    assert!(record["error"].as_str().unwrap().contains("fecha inválida"));
}

#[test]
fn execution_records_append_a_summary_for_multi_action_batches() {
    let conn = open_db_in_memory().unwrap();
    let owner = register_user(&conn, "ana@example.com");
    create_subject(&conn, owner, "Historia");

    let plan = plan_tool_calls(
        &conn,
        owner,
        &[
            call("create_subject", json!({"name": "Historia"})),
            call("create_subject", json!({"name": "Química"})),
        ],
    )
    .unwrap();
    let report = execute_actions(&conn, owner, &plan.actions);
    let records = execution_records(&report);

    assert_eq!(records.len(), 3);
    let trailer = records.last().unwrap();
    assert_eq!(trailer["kind"], "execution_summary");
    assert_eq!(trailer["total"], 2);
    assert_eq!(trailer["success"], 1);
    assert_eq!(trailer["skipped"], 1);
    assert_eq!(trailer["error"], 0);
}

#[test]
fn single_action_execution_reports_no_summary_record() {
    let conn = open_db_in_memory().unwrap();
    let owner = register_user(&conn, "ana@example.com");

    let plan = plan_tool_calls(
        &conn,
        owner,
        &[call("create_subject", json!({"name": "Historia"}))],
    )
    .unwrap();
    let report = execute_actions(&conn, owner, &plan.actions);
    let records = execution_records(&report);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["kind"], "create_subject");
}
