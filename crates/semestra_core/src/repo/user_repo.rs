//! User repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide registration, lookup and profile-update persistence for users.
//!
//! # Invariants
//! - `email` values are persisted exactly as given; normalization (trim,
//!   lowercase) happens in the service layer.
//! - Email uniqueness checks support excluding one user id for renames.

use crate::model::user::{ColorVision, User, UserDraft, UserId, UserProfilePatch};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const USER_SELECT_SQL: &str = "SELECT
    user_id,
    name,
    email,
    password_hash,
    color_vision,
    created_at
FROM users";

/// Repository interface for user persistence.
pub trait UserRepository {
    fn create_user(&self, draft: &UserDraft) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    fn email_in_use(&self, email: &str, exclude: Option<UserId>) -> RepoResult<bool>;
    fn update_profile(&self, id: UserId, patch: &UserProfilePatch) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["users"])?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, draft: &UserDraft) -> RepoResult<User> {
        draft.validate()?;

        self.conn.execute(
            "INSERT INTO users (name, email, password_hash, color_vision)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                draft.name.as_str(),
                draft.email.as_str(),
                draft.password_hash.as_str(),
                draft.color_vision.as_str(),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        load_required_user(self.conn, id)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE user_id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE email = ?1;"))?;
        let mut rows = stmt.query([email])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn email_in_use(&self, email: &str, exclude: Option<UserId>) -> RepoResult<bool> {
        let mut sql = String::from(
            "SELECT EXISTS(
                SELECT 1
                FROM users
                WHERE email = ?",
        );
        let mut bind_values: Vec<Value> = vec![Value::Text(email.to_string())];
        if let Some(excluded_id) = exclude {
            sql.push_str(" AND user_id != ?");
            bind_values.push(Value::Integer(excluded_id));
        }
        sql.push_str(");");

        let exists: i64 =
            self.conn
                .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        Ok(exists == 1)
    }

    fn update_profile(&self, id: UserId, patch: &UserProfilePatch) -> RepoResult<()> {
        patch.validate()?;
        if patch.is_empty() {
            // Still require the target row to exist.
            return match self.get_user(id)? {
                Some(_) => Ok(()),
                None => Err(RepoError::UserNotFound(id)),
            };
        }

        let mut assignments = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(name) = &patch.name {
            assignments.push("name = ?");
            bind_values.push(Value::Text(name.clone()));
        }
        if let Some(email) = &patch.email {
            assignments.push("email = ?");
            bind_values.push(Value::Text(email.clone()));
        }
        if let Some(profile) = patch.color_vision {
            assignments.push("color_vision = ?");
            bind_values.push(Value::Text(profile.as_str().to_string()));
        }

        let sql = format!(
            "UPDATE users SET {} WHERE user_id = ?;",
            assignments.join(", ")
        );
        bind_values.push(Value::Integer(id));

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::UserNotFound(id));
        }
        Ok(())
    }
}

fn load_required_user(conn: &Connection, id: UserId) -> RepoResult<User> {
    let mut stmt = conn.prepare(&format!("{USER_SELECT_SQL} WHERE user_id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return parse_user_row(row);
    }
    Err(RepoError::UserNotFound(id))
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let profile_text: String = row.get("color_vision")?;
    let color_vision = ColorVision::parse(&profile_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid color vision value `{profile_text}` in users.color_vision"
        ))
    })?;

    Ok(User {
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        color_vision,
        created_at: row.get("created_at")?,
    })
}
