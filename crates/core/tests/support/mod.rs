//! Mock store implementations for testing
//!
//! Provides an in-memory implementation of the `SessionStore` port, enabling
//! deterministic engine tests without database dependencies.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use caseload_core::SessionStore;
use caseload_domain::{CaseloadError, Result as DomainResult, Session, SessionPatch};
use chrono::{NaiveDate, NaiveTime, Utc};

/// In-memory mock for `SessionStore`.
///
/// Rows live in a mutex-guarded map keyed by session id. An optional insert
/// budget lets tests exercise mid-batch store failures.
#[derive(Default)]
pub struct InMemorySessionStore {
    rows: Mutex<HashMap<String, Session>>,
    insert_budget: Mutex<Option<usize>>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make inserts fail after `remaining` more rows have been written.
    pub fn fail_inserts_after(&self, remaining: usize) {
        *self.insert_budget.lock().unwrap() = Some(remaining);
    }

    /// Snapshot of a single row.
    pub fn session(&self, id: &str) -> Option<Session> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    /// Snapshot of every row, ordered by date then start time.
    pub fn all_sessions(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.rows.lock().unwrap().values().cloned().collect();
        sessions.sort_by(|a, b| (a.date, a.start_time).cmp(&(b.date, b.start_time)));
        sessions
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert_session(&self, session: &Session) -> DomainResult<()> {
        let mut budget = self.insert_budget.lock().unwrap();
        if let Some(remaining) = budget.as_mut() {
            if *remaining == 0 {
                return Err(CaseloadError::Database("injected insert failure".to_string()));
            }
            *remaining -= 1;
        }
        drop(budget);

        self.rows.lock().unwrap().insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, id: &str) -> DomainResult<Option<Session>> {
        Ok(self.rows.lock().unwrap().get(id).cloned())
    }

    async fn update_session(&self, session: &Session) -> DomainResult<()> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&session.id) {
            Some(row) => {
                *row = session.clone();
                Ok(())
            }
            None => Err(CaseloadError::NotFound(format!("session {} not found", session.id))),
        }
    }

    async fn delete_session(&self, owner_id: &str, id: &str) -> DomainResult<()> {
        let mut rows = self.rows.lock().unwrap();
        if rows.get(id).is_some_and(|row| row.owner_id == owner_id) {
            rows.remove(id);
        }
        Ok(())
    }

    async fn slot_exists(
        &self,
        owner_id: &str,
        client_id: &str,
        date: NaiveDate,
        start_time: NaiveTime,
    ) -> DomainResult<bool> {
        Ok(self.rows.lock().unwrap().values().any(|row| {
            row.owner_id == owner_id
                && row.client_id == client_id
                && row.date == date
                && row.start_time == start_time
        }))
    }

    async fn sessions_in_group_from(
        &self,
        owner_id: &str,
        group_id: &str,
        from: NaiveDate,
    ) -> DomainResult<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|row| {
                row.owner_id == owner_id
                    && row.recurring_group_id.as_deref() == Some(group_id)
                    && row.date >= from
            })
            .cloned()
            .collect();
        sessions.sort_by_key(|row| row.date);
        Ok(sessions)
    }

    async fn update_group_from(
        &self,
        owner_id: &str,
        group_id: &str,
        from: NaiveDate,
        patch: &SessionPatch,
    ) -> DomainResult<usize> {
        let now = Utc::now().timestamp();
        let mut updated = 0;

        for row in self.rows.lock().unwrap().values_mut() {
            let in_range = row.owner_id == owner_id
                && row.recurring_group_id.as_deref() == Some(group_id)
                && row.date >= from;
            if !in_range {
                continue;
            }

            if let Some(client_id) = &patch.client_id {
                row.client_id = client_id.clone();
            }
            if let Some(start) = patch.start_time {
                row.start_time = start;
            }
            if let Some(end) = patch.end_time {
                row.end_time = end;
            }
            if let Some(status) = &patch.status {
                row.status = status.clone();
            }
            if let Some(sync_status) = &patch.ehr_sync_status {
                row.ehr_sync_status = Some(sync_status.clone());
            }
            if let Some(has_note) = patch.has_note {
                row.has_note = has_note;
            }
            row.updated_at = now;
            updated += 1;
        }

        Ok(updated)
    }

    async fn delete_group_from(
        &self,
        owner_id: &str,
        group_id: &str,
        from: NaiveDate,
    ) -> DomainResult<usize> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|_, row| {
            !(row.owner_id == owner_id
                && row.recurring_group_id.as_deref() == Some(group_id)
                && row.date >= from)
        });
        Ok(before - rows.len())
    }

    async fn delete_group_after(
        &self,
        owner_id: &str,
        group_id: &str,
        after: NaiveDate,
    ) -> DomainResult<usize> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|_, row| {
            !(row.owner_id == owner_id
                && row.recurring_group_id.as_deref() == Some(group_id)
                && row.date > after)
        });
        Ok(before - rows.len())
    }
}
