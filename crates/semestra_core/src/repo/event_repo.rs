//! Event repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD and lookup APIs over `events` storage.
//! - Own the natural-key lookup `(subject_id, name, date)` used by the
//!   command planner's idempotency checks.
//!
//! # Invariants
//! - Event listings are deterministic: `date ASC, event_id ASC`.
//! - Dates are persisted as ISO `YYYY-MM-DD` text.

use crate::model::event::{Event, EventDraft, EventId, EventPatch, EventStatus};
use crate::model::subject::SubjectId;
use crate::model::user::UserId;
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const EVENT_SELECT_SQL: &str = "SELECT
    event_id,
    subject_id,
    name,
    description,
    date,
    status,
    created_at
FROM events";

const EVENTS_DEFAULT_LIMIT: u32 = 50;
const EVENTS_LIMIT_MAX: u32 = 200;

/// Query options for listing events under one subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventListQuery {
    /// Optional status filter.
    pub status: Option<EventStatus>,
    /// Maximum rows to return. Defaults to 50 and clamps to 200.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: u32,
}

/// Repository interface for event persistence.
pub trait EventRepository {
    fn create_event(&self, draft: &EventDraft) -> RepoResult<Event>;
    fn get_event(&self, id: EventId) -> RepoResult<Option<Event>>;
    /// Natural-key lookup `(subject_id, name, date)` for idempotency checks.
    fn find_by_natural_key(
        &self,
        subject_id: SubjectId,
        name: &str,
        date: NaiveDate,
    ) -> RepoResult<Option<Event>>;
    fn list_for_subject(
        &self,
        subject_id: SubjectId,
        query: &EventListQuery,
    ) -> RepoResult<Vec<Event>>;
    /// All events across every subject of one owner, ordered by date.
    fn list_for_owner(&self, owner: UserId) -> RepoResult<Vec<Event>>;
    fn update_event(&self, id: EventId, patch: &EventPatch) -> RepoResult<()>;
    fn delete_event(&self, id: EventId) -> RepoResult<()>;
}

/// SQLite-backed event repository.
pub struct SqliteEventRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["subjects", "events"])?;
        Ok(Self { conn })
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn create_event(&self, draft: &EventDraft) -> RepoResult<Event> {
        draft.validate()?;

        self.conn.execute(
            "INSERT INTO events (subject_id, name, description, date, status)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                draft.subject_id,
                draft.name.trim(),
                draft.description.as_deref(),
                draft.date,
                draft.status.as_str(),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        load_required_event(self.conn, id)
    }

    fn get_event(&self, id: EventId) -> RepoResult<Option<Event>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EVENT_SELECT_SQL} WHERE event_id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_event_row(row)?));
        }
        Ok(None)
    }

    fn find_by_natural_key(
        &self,
        subject_id: SubjectId,
        name: &str,
        date: NaiveDate,
    ) -> RepoResult<Option<Event>> {
        let mut stmt = self.conn.prepare(&format!(
            "{EVENT_SELECT_SQL}
             WHERE subject_id = ?1
               AND name = ?2
               AND date = ?3;"
        ))?;
        let mut rows = stmt.query(params![subject_id, name.trim(), date])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_event_row(row)?));
        }
        Ok(None)
    }

    fn list_for_subject(
        &self,
        subject_id: SubjectId,
        query: &EventListQuery,
    ) -> RepoResult<Vec<Event>> {
        let mut sql = format!("{EVENT_SELECT_SQL} WHERE subject_id = ?");
        let mut bind_values: Vec<Value> = vec![Value::Integer(subject_id)];

        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }

        sql.push_str(" ORDER BY date ASC, event_id ASC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(normalize_event_limit(query.limit))));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }
        Ok(events)
    }

    fn list_for_owner(&self, owner: UserId) -> RepoResult<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                e.event_id,
                e.subject_id,
                e.name,
                e.description,
                e.date,
                e.status,
                e.created_at
             FROM events e
             INNER JOIN subjects s ON s.subject_id = e.subject_id
             WHERE s.owner_id = ?1
             ORDER BY e.date ASC, e.event_id ASC;",
        )?;
        let mut rows = stmt.query([owner])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }
        Ok(events)
    }

    fn update_event(&self, id: EventId, patch: &EventPatch) -> RepoResult<()> {
        patch.validate()?;
        if patch.is_empty() {
            return match self.get_event(id)? {
                Some(_) => Ok(()),
                None => Err(RepoError::EventNotFound(id)),
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
        if let Some(date) = patch.date {
            assignments.push("date = ?");
            bind_values.push(Value::Text(date.format("%Y-%m-%d").to_string()));
        }
        if let Some(status) = patch.status {
            assignments.push("status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }

        let sql = format!(
            "UPDATE events SET {} WHERE event_id = ?;",
            assignments.join(", ")
        );
        bind_values.push(Value::Integer(id));

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::EventNotFound(id));
        }
        Ok(())
    }

    fn delete_event(&self, id: EventId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM events WHERE event_id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::EventNotFound(id));
        }
        Ok(())
    }
}

/// Normalizes list limit according to the events listing contract.
pub fn normalize_event_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => EVENTS_DEFAULT_LIMIT,
        Some(value) if value > EVENTS_LIMIT_MAX => EVENTS_LIMIT_MAX,
        Some(value) => value,
    }
}

fn load_required_event(conn: &Connection, id: EventId) -> RepoResult<Event> {
    let mut stmt = conn.prepare(&format!("{EVENT_SELECT_SQL} WHERE event_id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return parse_event_row(row);
    }
    Err(RepoError::EventNotFound(id))
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<Event> {
    let status_text: String = row.get("status")?;
    let status = EventStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid event status `{status_text}` in events.status"
        ))
    })?;

    let date_text: String = row.get("date")?;
    let date = NaiveDate::parse_from_str(&date_text, "%Y-%m-%d").map_err(|_| {
        RepoError::InvalidData(format!("invalid date value `{date_text}` in events.date"))
    })?;

    Ok(Event {
        event_id: row.get("event_id")?,
        subject_id: row.get("subject_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        date,
        status,
        created_at: row.get("created_at")?,
    })
}
