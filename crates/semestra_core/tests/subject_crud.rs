use rusqlite::Connection;
use semestra_core::db::open_db_in_memory;
use semestra_core::{
    ColorVision, SqliteSubjectRepository, SqliteUserRepository, SubjectDraft, SubjectListQuery,
    SubjectPatch, SubjectService, SubjectServiceError, UserDraft, UserId, UserService,
};

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

fn service(conn: &Connection) -> SubjectService<SqliteSubjectRepository<'_>> {
    SubjectService::new(SqliteSubjectRepository::try_new(conn).unwrap())
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let owner = register_user(&conn, "ana@example.com");
    let subjects = service(&conn);

    let created = subjects
        .create_subject(owner, &SubjectDraft::new("  Matemáticas  "))
        .unwrap();
    assert_eq!(created.name, "Matemáticas");
    assert_eq!(created.owner_id, owner);

    let fetched = subjects.get_subject(owner, created.subject_id).unwrap();
    assert_eq!(fetched, created);
}

#[test]
fn duplicate_name_for_same_owner_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let owner = register_user(&conn, "ana@example.com");
    let subjects = service(&conn);

    subjects
        .create_subject(owner, &SubjectDraft::new("Historia"))
        .unwrap();
    let err = subjects
        .create_subject(owner, &SubjectDraft::new(" Historia "))
        .unwrap_err();
    assert!(matches!(err, SubjectServiceError::DuplicateName(name) if name == "Historia"));
}

#[test]
fn same_name_under_different_owners_is_allowed() {
    let conn = open_db_in_memory().unwrap();
    let ana = register_user(&conn, "ana@example.com");
    let bruno = register_user(&conn, "bruno@example.com");
    let subjects = service(&conn);

    subjects
        .create_subject(ana, &SubjectDraft::new("Historia"))
        .unwrap();
    subjects
        .create_subject(bruno, &SubjectDraft::new("Historia"))
        .unwrap();
}

#[test]
fn foreign_subject_is_unauthorized_not_missing() {
    let conn = open_db_in_memory().unwrap();
    let ana = register_user(&conn, "ana@example.com");
    let bruno = register_user(&conn, "bruno@example.com");
    let subjects = service(&conn);

    let secret = subjects
        .create_subject(ana, &SubjectDraft::new("Química"))
        .unwrap();

    let get_err = subjects.get_subject(bruno, secret.subject_id).unwrap_err();
    assert!(matches!(get_err, SubjectServiceError::NotOwner(_)));

    let update_err = subjects
        .update_subject(
            bruno,
            secret.subject_id,
            &SubjectPatch {
                name: Some("Robada".to_string()),
                ..SubjectPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(update_err, SubjectServiceError::NotOwner(_)));

    let delete_err = subjects
        .delete_subject(bruno, secret.subject_id)
        .unwrap_err();
    assert!(matches!(delete_err, SubjectServiceError::NotOwner(_)));

    // Nothing changed for the real owner.
    let intact = subjects.get_subject(ana, secret.subject_id).unwrap();
    assert_eq!(intact.name, "Química");
}

#[test]
fn list_filters_by_case_insensitive_substring() {
    let conn = open_db_in_memory().unwrap();
    let owner = register_user(&conn, "ana@example.com");
    let subjects = service(&conn);

    for name in ["Historia", "Matemáticas", "Historia del Arte"] {
        subjects
            .create_subject(owner, &SubjectDraft::new(name))
            .unwrap();
    }

    let hits = subjects
        .list_subjects(
            owner,
            &SubjectListQuery {
                q: Some("hist".to_string()),
                ..SubjectListQuery::default()
            },
        )
        .unwrap();
    let names: Vec<&str> = hits.iter().map(|subject| subject.name.as_str()).collect();
    assert_eq!(names, ["Historia", "Historia del Arte"]);

    let all = subjects
        .list_subjects(owner, &SubjectListQuery::default())
        .unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn update_allows_keeping_own_name_but_not_taking_anothers() {
    let conn = open_db_in_memory().unwrap();
    let owner = register_user(&conn, "ana@example.com");
    let subjects = service(&conn);

    let historia = subjects
        .create_subject(owner, &SubjectDraft::new("Historia"))
        .unwrap();
    subjects
        .create_subject(owner, &SubjectDraft::new("Química"))
        .unwrap();

    // Same name plus a description change is fine.
    let updated = subjects
        .update_subject(
            owner,
            historia.subject_id,
            &SubjectPatch {
                name: Some("Historia".to_string()),
                description: Some("Siglo XX".to_string()),
            },
        )
        .unwrap();
    assert_eq!(updated.description.as_deref(), Some("Siglo XX"));

    let err = subjects
        .update_subject(
            owner,
            historia.subject_id,
            &SubjectPatch {
                name: Some("Química".to_string()),
                ..SubjectPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, SubjectServiceError::DuplicateName(_)));
}

#[test]
fn delete_removes_subject_and_cascades_events() {
    let conn = open_db_in_memory().unwrap();
    let owner = register_user(&conn, "ana@example.com");
    let subjects = service(&conn);

    let subject = subjects
        .create_subject(owner, &SubjectDraft::new("Física"))
        .unwrap();
    conn.execute(
        "INSERT INTO events (subject_id, name, date) VALUES (?1, 'Parcial', '2026-06-15');",
        [subject.subject_id],
    )
    .unwrap();

    subjects.delete_subject(owner, subject.subject_id).unwrap();

    let err = subjects.get_subject(owner, subject.subject_id).unwrap_err();
    assert!(matches!(err, SubjectServiceError::SubjectNotFound(_)));

    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM events;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn operations_on_missing_subject_return_not_found() {
    let conn = open_db_in_memory().unwrap();
    let owner = register_user(&conn, "ana@example.com");
    let subjects = service(&conn);

    let err = subjects.get_subject(owner, 999).unwrap_err();
    assert!(matches!(err, SubjectServiceError::SubjectNotFound(999)));

    let err = subjects.delete_subject(owner, 999).unwrap_err();
    assert!(matches!(err, SubjectServiceError::SubjectNotFound(999)));
}
