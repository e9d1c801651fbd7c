//! SQLite-backed implementation of the SessionStore port.

use std::sync::Arc;

use async_trait::async_trait;
use caseload_core::SessionStore;
use caseload_domain::{CaseloadError, RecurrenceFrequency, Result, Session, SessionPatch};
use chrono::{NaiveDate, NaiveTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, OptionalExtension, Row, ToSql};
use tracing::{debug, instrument};

use super::manager::DbManager;
use crate::errors::InfraError;

const SESSION_COLUMNS: &str = "id, owner_id, client_id, session_date, start_time, end_time,
        status, ehr_sync_status, has_note, recurring_group_id,
        recurring_frequency, recurring_end_date, created_at, updated_at";

/// SQLite implementation of SessionStore
pub struct SqliteSessionStore {
    manager: Arc<DbManager>,
}

impl SqliteSessionStore {
    /// Create a new session store over the given database manager.
    pub fn new(manager: Arc<DbManager>) -> Self {
        Self { manager }
    }
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    let frequency: Option<String> = row.get(10)?;
    let recurring_frequency = frequency
        .map(|raw| {
            raw.parse::<RecurrenceFrequency>()
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))
        })
        .transpose()?;

    Ok(Session {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        client_id: row.get(2)?,
        date: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        status: row.get(6)?,
        ehr_sync_status: row.get(7)?,
        has_note: row.get(8)?,
        recurring_group_id: row.get(9)?,
        recurring_frequency,
        recurring_end_date: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    async fn insert_session(&self, session: &Session) -> Result<()> {
        let conn = self.manager.get_connection()?;

        conn.execute(
            "INSERT INTO sessions (
                id, owner_id, client_id, session_date, start_time, end_time,
                status, ehr_sync_status, has_note, recurring_group_id,
                recurring_frequency, recurring_end_date, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                session.id,
                session.owner_id,
                session.client_id,
                session.date,
                session.start_time,
                session.end_time,
                session.status,
                session.ehr_sync_status,
                session.has_note,
                session.recurring_group_id,
                session.recurring_frequency.map(RecurrenceFrequency::as_str),
                session.recurring_end_date,
                session.created_at,
                session.updated_at,
            ],
        )
        .map_err(InfraError::from)?;

        debug!(session_id = %session.id, date = %session.date, "inserted session");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_session(&self, id: &str) -> Result<Option<Session>> {
        let conn = self.manager.get_connection()?;

        let session = conn
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                params![id],
                row_to_session,
            )
            .optional()
            .map_err(InfraError::from)?;

        Ok(session)
    }

    #[instrument(skip(self, session), fields(session_id = %session.id))]
    async fn update_session(&self, session: &Session) -> Result<()> {
        let conn = self.manager.get_connection()?;

        let updated = conn
            .execute(
                "UPDATE sessions SET
                    client_id = ?1, session_date = ?2, start_time = ?3, end_time = ?4,
                    status = ?5, ehr_sync_status = ?6, has_note = ?7,
                    recurring_group_id = ?8, recurring_frequency = ?9,
                    recurring_end_date = ?10, updated_at = ?11
                 WHERE id = ?12 AND owner_id = ?13",
                params![
                    session.client_id,
                    session.date,
                    session.start_time,
                    session.end_time,
                    session.status,
                    session.ehr_sync_status,
                    session.has_note,
                    session.recurring_group_id,
                    session.recurring_frequency.map(RecurrenceFrequency::as_str),
                    session.recurring_end_date,
                    session.updated_at,
                    session.id,
                    session.owner_id,
                ],
            )
            .map_err(InfraError::from)?;

        if updated == 0 {
            return Err(CaseloadError::NotFound(format!("session {} not found", session.id)));
        }

        debug!(session_id = %session.id, "updated session");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_session(&self, owner_id: &str, id: &str) -> Result<()> {
        let conn = self.manager.get_connection()?;

        let deleted = conn
            .execute(
                "DELETE FROM sessions WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
            )
            .map_err(InfraError::from)?;

        debug!(session_id = %id, deleted, "deleted session");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn slot_exists(
        &self,
        owner_id: &str,
        client_id: &str,
        date: NaiveDate,
        start_time: NaiveTime,
    ) -> Result<bool> {
        let conn = self.manager.get_connection()?;

        let exists = conn
            .query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM sessions
                    WHERE owner_id = ?1 AND client_id = ?2
                      AND session_date = ?3 AND start_time = ?4
                )",
                params![owner_id, client_id, date, start_time],
                |row| row.get::<_, bool>(0),
            )
            .map_err(InfraError::from)?;

        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn sessions_in_group_from(
        &self,
        owner_id: &str,
        group_id: &str,
        from: NaiveDate,
    ) -> Result<Vec<Session>> {
        let conn = self.manager.get_connection()?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE owner_id = ?1 AND recurring_group_id = ?2 AND session_date >= ?3
                 ORDER BY session_date ASC"
            ))
            .map_err(InfraError::from)?;

        let sessions = stmt
            .query_map(params![owner_id, group_id, from], row_to_session)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<Session>>>()
            .map_err(InfraError::from)?;

        debug!(group_id, %from, count = sessions.len(), "retrieved group sessions");
        Ok(sessions)
    }

    #[instrument(skip(self, patch))]
    async fn update_group_from(
        &self,
        owner_id: &str,
        group_id: &str,
        from: NaiveDate,
        patch: &SessionPatch,
    ) -> Result<usize> {
        let conn = self.manager.get_connection()?;

        // Only the non-recurrence, non-date fields are applied here; pattern
        // changes go through delete-and-regenerate instead.
        let mut assignments: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(client_id) = &patch.client_id {
            values.push(Box::new(client_id.clone()));
            assignments.push(format!("client_id = ?{}", values.len()));
        }
        if let Some(start_time) = patch.start_time {
            values.push(Box::new(start_time));
            assignments.push(format!("start_time = ?{}", values.len()));
        }
        if let Some(end_time) = patch.end_time {
            values.push(Box::new(end_time));
            assignments.push(format!("end_time = ?{}", values.len()));
        }
        if let Some(status) = &patch.status {
            values.push(Box::new(status.clone()));
            assignments.push(format!("status = ?{}", values.len()));
        }
        if let Some(sync_status) = &patch.ehr_sync_status {
            values.push(Box::new(sync_status.clone()));
            assignments.push(format!("ehr_sync_status = ?{}", values.len()));
        }
        if let Some(has_note) = patch.has_note {
            values.push(Box::new(has_note));
            assignments.push(format!("has_note = ?{}", values.len()));
        }

        values.push(Box::new(Utc::now().timestamp()));
        assignments.push(format!("updated_at = ?{}", values.len()));

        let sql = format!(
            "UPDATE sessions SET {} WHERE owner_id = ?{} AND recurring_group_id = ?{} AND session_date >= ?{}",
            assignments.join(", "),
            values.len() + 1,
            values.len() + 2,
            values.len() + 3,
        );
        values.push(Box::new(owner_id.to_string()));
        values.push(Box::new(group_id.to_string()));
        values.push(Box::new(from));

        let updated = conn
            .execute(&sql, params_from_iter(values.iter().map(|v| v.as_ref() as &dyn ToSql)))
            .map_err(InfraError::from)?;

        debug!(group_id, %from, updated, "range-updated group sessions");
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete_group_from(
        &self,
        owner_id: &str,
        group_id: &str,
        from: NaiveDate,
    ) -> Result<usize> {
        let conn = self.manager.get_connection()?;

        let deleted = conn
            .execute(
                "DELETE FROM sessions
                 WHERE owner_id = ?1 AND recurring_group_id = ?2 AND session_date >= ?3",
                params![owner_id, group_id, from],
            )
            .map_err(InfraError::from)?;

        debug!(group_id, %from, deleted, "range-deleted group sessions");
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn delete_group_after(
        &self,
        owner_id: &str,
        group_id: &str,
        after: NaiveDate,
    ) -> Result<usize> {
        let conn = self.manager.get_connection()?;

        let deleted = conn
            .execute(
                "DELETE FROM sessions
                 WHERE owner_id = ?1 AND recurring_group_id = ?2 AND session_date > ?3",
                params![owner_id, group_id, after],
            )
            .map_err(InfraError::from)?;

        debug!(group_id, %after, deleted, "deleted strictly-future group sessions");
        Ok(deleted)
    }
}
