//! Occurrence date generation for recurring series.
//!
//! Pure and deterministic; no I/O. Generation either yields the complete
//! date sequence or fails before producing anything.

use caseload_domain::constants::MAX_OCCURRENCES;
use caseload_domain::{CaseloadError, RecurrenceFrequency, Result};
use chrono::{Days, NaiveDate};

/// Produce the ordered occurrence dates for a recurrence pattern.
///
/// The first element is always `start`; each following date steps by the
/// frequency's fixed day offset, and every element is `<= end`.
///
/// # Errors
///
/// Returns `InvalidInput` when `end` precedes `start`, and `LimitExceeded`
/// when the sequence would contain more than [`MAX_OCCURRENCES`] dates. No
/// partial sequence is returned on failure.
pub fn generate(
    start: NaiveDate,
    frequency: RecurrenceFrequency,
    end: NaiveDate,
) -> Result<Vec<NaiveDate>> {
    if end < start {
        return Err(CaseloadError::InvalidInput(format!(
            "recurrence end date {end} is before start date {start}"
        )));
    }

    let step = frequency.step_days();
    let span_days = end.signed_duration_since(start).num_days() as u64;
    let count = (span_days / step + 1) as usize;
    if count > MAX_OCCURRENCES {
        return Err(CaseloadError::LimitExceeded(format!(
            "recurrence would generate {count} occurrences (maximum {MAX_OCCURRENCES})"
        )));
    }

    let mut dates = Vec::with_capacity(count);
    let mut current = start;
    while current <= end {
        dates.push(current);
        current = current.checked_add_days(Days::new(step)).ok_or_else(|| {
            CaseloadError::InvalidInput(format!("occurrence date out of range after {current}"))
        })?;
    }

    Ok(dates)
}
