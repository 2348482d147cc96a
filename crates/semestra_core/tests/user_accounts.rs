use rusqlite::Connection;
use semestra_core::db::open_db_in_memory;
use semestra_core::{
    ColorVision, SqliteUserRepository, UserDraft, UserProfilePatch, UserService, UserServiceError,
};

fn service(conn: &Connection) -> UserService<SqliteUserRepository<'_>> {
    UserService::new(SqliteUserRepository::try_new(conn).unwrap())
}

fn draft(name: &str, email: &str) -> UserDraft {
    UserDraft {
        name: name.to_string(),
        email: email.to_string(),
        password_hash: "pbkdf2$stub".to_string(),
        color_vision: ColorVision::Normal,
    }
}

#[test]
fn register_normalizes_name_and_email() {
    let conn = open_db_in_memory().unwrap();
    let users = service(&conn);

    let user = users
        .register_user(draft("  Ana  ", "  Ana@Example.COM "))
        .unwrap();

    assert_eq!(user.name, "Ana");
    assert_eq!(user.email, "ana@example.com");
    assert!(user.created_at > 0);
}

#[test]
fn register_rejects_duplicate_email_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let users = service(&conn);

    users.register_user(draft("Ana", "ana@example.com")).unwrap();
    let err = users
        .register_user(draft("Otra", "ANA@example.com"))
        .unwrap_err();
    assert!(matches!(err, UserServiceError::DuplicateEmail(email) if email == "ana@example.com"));
}

#[test]
fn update_profile_changes_fields_and_keeps_uniqueness() {
    let conn = open_db_in_memory().unwrap();
    let users = service(&conn);

    let ana = users.register_user(draft("Ana", "ana@example.com")).unwrap();
    let bruno = users
        .register_user(draft("Bruno", "bruno@example.com"))
        .unwrap();

    let updated = users
        .update_profile(
            ana.user_id,
            UserProfilePatch {
                name: Some("Ana María".to_string()),
                email: None,
                color_vision: Some(ColorVision::Deuteranopia),
            },
        )
        .unwrap();
    assert_eq!(updated.name, "Ana María");
    assert_eq!(updated.color_vision, ColorVision::Deuteranopia);

    // Renaming to another account's email must fail.
    let err = users
        .update_profile(
            bruno.user_id,
            UserProfilePatch {
                email: Some("ana@example.com".to_string()),
                ..UserProfilePatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, UserServiceError::DuplicateEmail(_)));

    // Keeping your own email is not a conflict.
    users
        .update_profile(
            ana.user_id,
            UserProfilePatch {
                email: Some("ana@example.com".to_string()),
                ..UserProfilePatch::default()
            },
        )
        .unwrap();
}

#[test]
fn update_profile_of_unknown_user_fails() {
    let conn = open_db_in_memory().unwrap();
    let users = service(&conn);

    let err = users
        .update_profile(
            999,
            UserProfilePatch {
                name: Some("Nadie".to_string()),
                ..UserProfilePatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, UserServiceError::UserNotFound(999)));
}

#[test]
fn get_user_never_leaks_password_hash_in_json() {
    let conn = open_db_in_memory().unwrap();
    let users = service(&conn);

    let user = users.register_user(draft("Ana", "ana@example.com")).unwrap();
    let json = serde_json::to_value(users.get_user(user.user_id).unwrap()).unwrap();
    assert!(json.get("password_hash").is_none());
    assert_eq!(json["email"], "ana@example.com");
}
