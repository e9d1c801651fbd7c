//! Port interfaces for session persistence
//!
//! These traits define the boundaries between core scheduling logic
//! and infrastructure implementations.

use async_trait::async_trait;
use caseload_domain::{Result, Session, SessionPatch};
use chrono::{NaiveDate, NaiveTime};

/// Trait for persisting session rows.
///
/// Range operations and the slot-existence check are always filtered by
/// `owner_id`; one practice's operations can never read or mutate another's
/// rows through them. The point lookup is by primary key, ownership of the
/// returned row is checked by the caller.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a single session row.
    ///
    /// Each insert must be independently safe to retry; the engine performs
    /// its own duplicate-slot check before calling this.
    async fn insert_session(&self, session: &Session) -> Result<()>;

    /// Look up a session by id.
    async fn find_session(&self, id: &str) -> Result<Option<Session>>;

    /// Replace a session row with the given state.
    async fn update_session(&self, session: &Session) -> Result<()>;

    /// Delete a single session row owned by `owner_id`.
    async fn delete_session(&self, owner_id: &str, id: &str) -> Result<()>;

    /// Whether a session already exists for this exact
    /// `(owner, client, date, start time)` slot.
    async fn slot_exists(
        &self,
        owner_id: &str,
        client_id: &str,
        date: NaiveDate,
        start_time: NaiveTime,
    ) -> Result<bool>;

    /// All sessions in a recurring group with `date >= from`, ordered by
    /// date.
    async fn sessions_in_group_from(
        &self,
        owner_id: &str,
        group_id: &str,
        from: NaiveDate,
    ) -> Result<Vec<Session>>;

    /// Apply the non-recurrence, non-date fields of `patch` to every session
    /// in the group with `date >= from`. Returns the number of rows updated.
    async fn update_group_from(
        &self,
        owner_id: &str,
        group_id: &str,
        from: NaiveDate,
        patch: &SessionPatch,
    ) -> Result<usize>;

    /// Delete every session in the group with `date >= from`. Returns the
    /// number of rows deleted.
    async fn delete_group_from(
        &self,
        owner_id: &str,
        group_id: &str,
        from: NaiveDate,
    ) -> Result<usize>;

    /// Delete every session in the group with `date > after`, leaving the
    /// occurrence on `after` itself in place. Returns the number of rows
    /// deleted.
    async fn delete_group_after(
        &self,
        owner_id: &str,
        group_id: &str,
        after: NaiveDate,
    ) -> Result<usize>;
}
