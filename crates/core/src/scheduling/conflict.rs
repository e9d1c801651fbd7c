//! Occupied-slot detection for batch scheduling.
//!
//! The guard makes the skip-on-duplicate policy explicit instead of relying
//! on a storage-layer unique constraint. It is consulted only on the batch
//! creation path; single-session creation bypasses it.

use std::sync::Arc;

use caseload_domain::Result;
use chrono::{NaiveDate, NaiveTime};
use tracing::debug;

use super::ports::SessionStore;

/// Checks whether a candidate slot is already occupied.
pub struct ConflictGuard {
    store: Arc<dyn SessionStore>,
}

impl ConflictGuard {
    /// Create a guard over the given store.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Whether the owner already has a session for this client at this exact
    /// date and start time.
    pub async fn is_occupied(
        &self,
        owner_id: &str,
        client_id: &str,
        date: NaiveDate,
        start_time: NaiveTime,
    ) -> Result<bool> {
        let occupied = self.store.slot_exists(owner_id, client_id, date, start_time).await?;
        if occupied {
            debug!(client_id, %date, %start_time, "candidate slot already occupied");
        }
        Ok(occupied)
    }
}
