//! Subject repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD and lookup APIs over `subjects` storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Deletes are hard deletes; owned events are removed by FK cascade.
//! - Name lookups used for idempotency compare the trimmed name exactly.

use crate::model::subject::{Subject, SubjectDraft, SubjectId, SubjectPatch};
use crate::model::user::UserId;
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const SUBJECT_SELECT_SQL: &str = "SELECT
    subject_id,
    owner_id,
    name,
    description,
    created_at
FROM subjects";

const SUBJECTS_DEFAULT_LIMIT: u32 = 50;
const SUBJECTS_LIMIT_MAX: u32 = 200;

/// Query options for listing subjects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectListQuery {
    /// Optional case-insensitive substring filter on the subject name.
    pub q: Option<String>,
    /// Maximum rows to return. Defaults to 50 and clamps to 200.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: u32,
}

/// Repository interface for subject persistence.
pub trait SubjectRepository {
    fn create_subject(&self, owner: UserId, draft: &SubjectDraft) -> RepoResult<Subject>;
    fn get_subject(&self, id: SubjectId) -> RepoResult<Option<Subject>>;
    /// Exact-name lookup scoped to one owner (idempotency natural key).
    fn find_by_owner_and_name(&self, owner: UserId, name: &str) -> RepoResult<Option<Subject>>;
    fn list_subjects(&self, owner: UserId, query: &SubjectListQuery) -> RepoResult<Vec<Subject>>;
    fn update_subject(&self, id: SubjectId, patch: &SubjectPatch) -> RepoResult<()>;
    fn delete_subject(&self, id: SubjectId) -> RepoResult<()>;
}

/// SQLite-backed subject repository.
pub struct SqliteSubjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSubjectRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["users", "subjects"])?;
        Ok(Self { conn })
    }
}

impl SubjectRepository for SqliteSubjectRepository<'_> {
    fn create_subject(&self, owner: UserId, draft: &SubjectDraft) -> RepoResult<Subject> {
        draft.validate()?;

        self.conn.execute(
            "INSERT INTO subjects (owner_id, name, description)
             VALUES (?1, ?2, ?3);",
            params![
                owner,
                draft.name.trim(),
                draft.description.as_deref(),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        load_required_subject(self.conn, id)
    }

    fn get_subject(&self, id: SubjectId) -> RepoResult<Option<Subject>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SUBJECT_SELECT_SQL} WHERE subject_id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_subject_row(row)?));
        }
        Ok(None)
    }

    fn find_by_owner_and_name(&self, owner: UserId, name: &str) -> RepoResult<Option<Subject>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SUBJECT_SELECT_SQL}
             WHERE owner_id = ?1
               AND name = ?2;"
        ))?;
        let mut rows = stmt.query(params![owner, name.trim()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_subject_row(row)?));
        }
        Ok(None)
    }

    fn list_subjects(&self, owner: UserId, query: &SubjectListQuery) -> RepoResult<Vec<Subject>> {
        let mut sql = format!("{SUBJECT_SELECT_SQL} WHERE owner_id = ?");
        let mut bind_values: Vec<Value> = vec![Value::Integer(owner)];

        if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            sql.push_str(" AND instr(lower(name), lower(?)) > 0");
            bind_values.push(Value::Text(q.to_string()));
        }

        sql.push_str(" ORDER BY name ASC, subject_id ASC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(normalize_subject_limit(
            query.limit,
        ))));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut subjects = Vec::new();
        while let Some(row) = rows.next()? {
            subjects.push(parse_subject_row(row)?);
        }
        Ok(subjects)
    }

    fn update_subject(&self, id: SubjectId, patch: &SubjectPatch) -> RepoResult<()> {
        patch.validate()?;
        if patch.is_empty() {
            return match self.get_subject(id)? {
                Some(_) => Ok(()),
                None => Err(RepoError::SubjectNotFound(id)),
            };
        }

        let mut assignments = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(name) = &patch.name {
            assignments.push("name = ?");
            bind_values.push(Value::Text(name.trim().to_string()));
        }
        if let Some(description) = &patch.description {
            assignments.push("description = ?");
            bind_values.push(Value::Text(description.clone()));
        }

        let sql = format!(
            "UPDATE subjects SET {} WHERE subject_id = ?;",
            assignments.join(", ")
        );
        bind_values.push(Value::Integer(id));

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::SubjectNotFound(id));
        }
        Ok(())
    }

    fn delete_subject(&self, id: SubjectId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM subjects WHERE subject_id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::SubjectNotFound(id));
        }
        Ok(())
    }
}

/// Normalizes list limit according to the subjects listing contract.
pub fn normalize_subject_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => SUBJECTS_DEFAULT_LIMIT,
        Some(value) if value > SUBJECTS_LIMIT_MAX => SUBJECTS_LIMIT_MAX,
        Some(value) => value,
    }
}

fn load_required_subject(conn: &Connection, id: SubjectId) -> RepoResult<Subject> {
    let mut stmt = conn.prepare(&format!("{SUBJECT_SELECT_SQL} WHERE subject_id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return parse_subject_row(row);
    }
    Err(RepoError::SubjectNotFound(id))
}

fn parse_subject_row(row: &Row<'_>) -> RepoResult<Subject> {
    Ok(Subject {
        subject_id: row.get("subject_id")?,
        owner_id: row.get("owner_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    })
}
