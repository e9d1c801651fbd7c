//! Scheduling service - core business logic
//!
//! Orchestrates session creation, scoped updates/deletes, and conversion
//! between one-time and recurring sessions. Each session is either
//! non-recurring (`recurring_group_id` absent) or a member of exactly one
//! recurring group; the operations below move rows between those two states
//! and keep the occurrence set of a group consistent.

use std::sync::Arc;

use caseload_domain::constants::DEFAULT_SESSION_STATUS;
use caseload_domain::{
    CaseloadError, EditScope, RecurrenceFrequency, Result, Session, SessionDraft, SessionPatch,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::conflict::ConflictGuard;
use super::ports::SessionStore;
use super::recurrence;

/// Field values shared by every occurrence inserted for one series.
struct SeriesSeed {
    owner_id: String,
    client_id: String,
    start_time: NaiveTime,
    end_time: NaiveTime,
    status: String,
    ehr_sync_status: Option<String>,
    has_note: bool,
    frequency: RecurrenceFrequency,
    end_date: NaiveDate,
}

/// Recurring-session scheduling engine.
pub struct SchedulingService {
    store: Arc<dyn SessionStore>,
    conflicts: ConflictGuard,
}

impl SchedulingService {
    /// Create a new scheduling service over the given store.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        let conflicts = ConflictGuard::new(Arc::clone(&store));
        Self { store, conflicts }
    }

    /// Create a single non-recurring session.
    ///
    /// Performs no occupied-slot check; only batch creation consults the
    /// conflict guard.
    ///
    /// # Errors
    /// Returns `InvalidInput` when the end time is not after the start time.
    pub async fn create_session(&self, draft: SessionDraft) -> Result<Session> {
        validate_times(draft.start_time, draft.end_time)?;

        let now = Utc::now().timestamp();
        let session = Session {
            id: Uuid::now_v7().to_string(),
            owner_id: draft.owner_id,
            client_id: draft.client_id,
            date: draft.date,
            start_time: draft.start_time,
            end_time: draft.end_time,
            status: draft.status.unwrap_or_else(|| DEFAULT_SESSION_STATUS.to_string()),
            ehr_sync_status: draft.ehr_sync_status,
            has_note: draft.has_note,
            recurring_group_id: None,
            recurring_frequency: None,
            recurring_end_date: None,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_session(&session).await?;

        info!(session_id = %session.id, date = %session.date, "created session");
        Ok(session)
    }

    /// Create a full recurring series from a draft carrying a frequency and
    /// an end date.
    ///
    /// Occurrence dates are generated up front, so a cap violation fails the
    /// request before anything is written. Every inserted occurrence shares
    /// one freshly minted group id. Dates whose slot is already occupied are
    /// skipped, not errors; the returned set may therefore be smaller than
    /// the generated sequence.
    ///
    /// # Errors
    /// Returns `InvalidInput` when the frequency or end date is missing or
    /// the times are invalid, and `LimitExceeded` when generation would
    /// overrun the occurrence cap.
    pub async fn create_recurring_sessions(&self, draft: SessionDraft) -> Result<Vec<Session>> {
        validate_times(draft.start_time, draft.end_time)?;

        let frequency = draft.recurring_frequency.ok_or_else(|| {
            CaseloadError::InvalidInput("recurring frequency is required".to_string())
        })?;
        let end_date = draft.recurring_end_date.ok_or_else(|| {
            CaseloadError::InvalidInput("recurring end date is required".to_string())
        })?;

        let dates = recurrence::generate(draft.date, frequency, end_date)?;

        let group_id = Uuid::now_v7().to_string();
        let seed = SeriesSeed {
            owner_id: draft.owner_id,
            client_id: draft.client_id,
            start_time: draft.start_time,
            end_time: draft.end_time,
            status: draft.status.unwrap_or_else(|| DEFAULT_SESSION_STATUS.to_string()),
            ehr_sync_status: draft.ehr_sync_status,
            has_note: draft.has_note,
            frequency,
            end_date,
        };

        let created = self.insert_series(&seed, &dates, &group_id).await?;

        info!(
            group_id = %group_id,
            generated = dates.len(),
            created = created.len(),
            "created recurring series"
        );
        Ok(created)
    }

    /// Update a session with the given scope.
    ///
    /// - `Single` updates only the targeted row's non-recurrence fields.
    /// - `AllFuture` on a grouped row updates the target and every later
    ///   sibling. When the patch leaves the occurrence date and the
    ///   recurrence pattern unchanged this is an in-place range update;
    ///   otherwise the tail is deleted and regenerated under a new group id,
    ///   splitting the lineage at the target date.
    /// - `AllFuture` on a non-grouped row behaves like `Single`.
    ///
    /// Returns the rows affected by the update (updated in place or newly
    /// regenerated).
    ///
    /// # Errors
    /// Returns `NotFound`/`Forbidden` when the target is absent or owned by
    /// another practice, `InvalidInput` for invalid times, and
    /// `LimitExceeded` when a regenerated tail would overrun the cap.
    pub async fn update_session_with_scope(
        &self,
        owner_id: &str,
        id: &str,
        scope: EditScope,
        patch: SessionPatch,
    ) -> Result<Vec<Session>> {
        let target = self.fetch_owned(owner_id, id).await?;

        let group_id = match (scope, target.recurring_group_id.clone()) {
            (EditScope::AllFuture, Some(group_id)) => group_id,
            _ => {
                let updated = self.apply_single(target, &patch).await?;
                return Ok(vec![updated]);
            }
        };

        if patch.changes_pattern(&target) {
            return self.regenerate_tail(&target, &group_id, &patch).await;
        }

        let start = patch.start_time.unwrap_or(target.start_time);
        let end = patch.end_time.unwrap_or(target.end_time);
        validate_times(start, end)?;

        let updated =
            self.store.update_group_from(owner_id, &group_id, target.date, &patch).await?;
        debug!(group_id = %group_id, from = %target.date, updated, "updated future occurrences in place");

        self.store.sessions_in_group_from(owner_id, &group_id, target.date).await
    }

    /// Delete a session with the given scope.
    ///
    /// `AllFuture` on a grouped row removes the target and every later
    /// sibling; earlier occurrences in the group survive. On a non-grouped
    /// row both scopes delete exactly the target. Returns the number of rows
    /// removed.
    ///
    /// # Errors
    /// Returns `NotFound`/`Forbidden` when the target is absent or owned by
    /// another practice.
    pub async fn delete_session_with_scope(
        &self,
        owner_id: &str,
        id: &str,
        scope: EditScope,
    ) -> Result<usize> {
        let target = self.fetch_owned(owner_id, id).await?;

        match (scope, target.recurring_group_id.as_deref()) {
            (EditScope::AllFuture, Some(group_id)) => {
                let removed =
                    self.store.delete_group_from(owner_id, group_id, target.date).await?;
                info!(group_id, from = %target.date, removed, "deleted future occurrences");
                Ok(removed)
            }
            _ => {
                self.store.delete_session(owner_id, id).await?;
                info!(session_id = %id, "deleted session");
                Ok(1)
            }
        }
    }

    /// Delete the targeted occurrence and every later sibling in its group.
    ///
    /// Exposed alias of [`Self::delete_session_with_scope`] with
    /// [`EditScope::AllFuture`].
    ///
    /// # Errors
    /// Same as [`Self::delete_session_with_scope`].
    pub async fn delete_future_sessions(&self, owner_id: &str, id: &str) -> Result<usize> {
        self.delete_session_with_scope(owner_id, id, EditScope::AllFuture).await
    }

    /// Convert a one-time session into a recurring series.
    ///
    /// The original row is deleted and the series is created starting at its
    /// date, carrying over its client, times, status and pass-through
    /// fields. Generation runs first, so a cap violation leaves the original
    /// row untouched.
    ///
    /// # Errors
    /// Returns `NotFound`/`Forbidden` for a missing or foreign target,
    /// `InvalidInput` when the end date precedes the session date, and
    /// `LimitExceeded` when generation would overrun the cap.
    pub async fn convert_to_recurring(
        &self,
        owner_id: &str,
        id: &str,
        frequency: RecurrenceFrequency,
        end_date: NaiveDate,
    ) -> Result<Vec<Session>> {
        let target = self.fetch_owned(owner_id, id).await?;

        let dates = recurrence::generate(target.date, frequency, end_date)?;

        self.store.delete_session(owner_id, id).await?;

        let group_id = Uuid::now_v7().to_string();
        let seed = SeriesSeed {
            owner_id: target.owner_id,
            client_id: target.client_id,
            start_time: target.start_time,
            end_time: target.end_time,
            status: target.status,
            ehr_sync_status: target.ehr_sync_status,
            has_note: target.has_note,
            frequency,
            end_date,
        };

        let created = self.insert_series(&seed, &dates, &group_id).await?;

        info!(
            session_id = %id,
            group_id = %group_id,
            occurrences = created.len(),
            "converted session to recurring series"
        );
        Ok(created)
    }

    /// Convert a recurring occurrence back into a one-time session.
    ///
    /// Strictly-future siblings are removed, the targeted occurrence itself
    /// is preserved with its recurrence fields cleared. A non-recurring
    /// target is returned unchanged.
    ///
    /// # Errors
    /// Returns `NotFound`/`Forbidden` for a missing or foreign target.
    pub async fn convert_from_recurring(&self, owner_id: &str, id: &str) -> Result<Session> {
        let mut target = self.fetch_owned(owner_id, id).await?;

        let Some(group_id) = target.recurring_group_id.take() else {
            debug!(session_id = %id, "session is not recurring, nothing to convert");
            return Ok(target);
        };

        let removed = self.store.delete_group_after(owner_id, &group_id, target.date).await?;

        target.recurring_frequency = None;
        target.recurring_end_date = None;
        target.updated_at = Utc::now().timestamp();
        self.store.update_session(&target).await?;

        info!(
            session_id = %target.id,
            group_id = %group_id,
            removed,
            "converted session to one-time"
        );
        Ok(target)
    }

    /// Insert one occurrence per date, skipping dates whose slot is already
    /// occupied. All inserted rows share `group_id`.
    async fn insert_series(
        &self,
        seed: &SeriesSeed,
        dates: &[NaiveDate],
        group_id: &str,
    ) -> Result<Vec<Session>> {
        let mut created = Vec::with_capacity(dates.len());

        for &date in dates {
            let occupied = self
                .conflicts
                .is_occupied(&seed.owner_id, &seed.client_id, date, seed.start_time)
                .await?;
            if occupied {
                warn!(%date, client_id = %seed.client_id, "slot already booked, skipping occurrence");
                continue;
            }

            let now = Utc::now().timestamp();
            let session = Session {
                id: Uuid::now_v7().to_string(),
                owner_id: seed.owner_id.clone(),
                client_id: seed.client_id.clone(),
                date,
                start_time: seed.start_time,
                end_time: seed.end_time,
                status: seed.status.clone(),
                ehr_sync_status: seed.ehr_sync_status.clone(),
                has_note: seed.has_note,
                recurring_group_id: Some(group_id.to_string()),
                recurring_frequency: Some(seed.frequency),
                recurring_end_date: Some(seed.end_date),
                created_at: now,
                updated_at: now,
            };

            self.store.insert_session(&session).await?;
            created.push(session);
        }

        Ok(created)
    }

    /// Apply the non-recurrence fields of `patch` to one row.
    async fn apply_single(&self, mut session: Session, patch: &SessionPatch) -> Result<Session> {
        if let Some(client_id) = &patch.client_id {
            session.client_id = client_id.clone();
        }
        if let Some(date) = patch.date {
            session.date = date;
        }
        if let Some(start) = patch.start_time {
            session.start_time = start;
        }
        if let Some(end) = patch.end_time {
            session.end_time = end;
        }
        if let Some(status) = &patch.status {
            session.status = status.clone();
        }
        if let Some(sync_status) = &patch.ehr_sync_status {
            session.ehr_sync_status = Some(sync_status.clone());
        }
        if let Some(has_note) = patch.has_note {
            session.has_note = has_note;
        }

        validate_times(session.start_time, session.end_time)?;

        session.updated_at = Utc::now().timestamp();
        self.store.update_session(&session).await?;

        debug!(session_id = %session.id, "updated single occurrence");
        Ok(session)
    }

    /// Replace the tail of a series whose date or pattern changed: delete
    /// every occurrence from the target date on, then regenerate from the
    /// patched date and pattern under a new group id. Rows before the target
    /// date stay under the old group id; the lineage splits at the target.
    async fn regenerate_tail(
        &self,
        target: &Session,
        group_id: &str,
        patch: &SessionPatch,
    ) -> Result<Vec<Session>> {
        let start_time = patch.start_time.unwrap_or(target.start_time);
        let end_time = patch.end_time.unwrap_or(target.end_time);
        validate_times(start_time, end_time)?;

        let new_date = patch.date.unwrap_or(target.date);
        let frequency =
            patch.recurring_frequency.or(target.recurring_frequency).ok_or_else(|| {
                CaseloadError::InvalidInput("recurring frequency is required".to_string())
            })?;
        let end_date =
            patch.recurring_end_date.or(target.recurring_end_date).ok_or_else(|| {
                CaseloadError::InvalidInput("recurring end date is required".to_string())
            })?;

        // Generate before deleting anything so a cap violation aborts with
        // the series intact.
        let dates = recurrence::generate(new_date, frequency, end_date)?;

        let removed =
            self.store.delete_group_from(&target.owner_id, group_id, target.date).await?;

        let new_group_id = Uuid::now_v7().to_string();
        let seed = SeriesSeed {
            owner_id: target.owner_id.clone(),
            client_id: patch.client_id.clone().unwrap_or_else(|| target.client_id.clone()),
            start_time,
            end_time,
            status: patch.status.clone().unwrap_or_else(|| target.status.clone()),
            ehr_sync_status: patch
                .ehr_sync_status
                .clone()
                .or_else(|| target.ehr_sync_status.clone()),
            has_note: patch.has_note.unwrap_or(target.has_note),
            frequency,
            end_date,
        };

        let created = self.insert_series(&seed, &dates, &new_group_id).await?;

        info!(
            old_group_id = %group_id,
            new_group_id = %new_group_id,
            removed,
            created = created.len(),
            "regenerated series tail under new group"
        );
        Ok(created)
    }

    /// Fetch the target row and check it belongs to the calling practice.
    async fn fetch_owned(&self, owner_id: &str, id: &str) -> Result<Session> {
        let session = self
            .store
            .find_session(id)
            .await?
            .ok_or_else(|| CaseloadError::NotFound(format!("session {id} not found")))?;

        if session.owner_id != owner_id {
            return Err(CaseloadError::Forbidden(format!(
                "session {id} belongs to another practice"
            )));
        }

        Ok(session)
    }
}

fn validate_times(start: NaiveTime, end: NaiveTime) -> Result<()> {
    if end <= start {
        return Err(CaseloadError::InvalidInput(
            "end time must be after start time".to_string(),
        ));
    }
    Ok(())
}
