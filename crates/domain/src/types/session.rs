//! Session model types
//!
//! These types represent scheduled sessions and their recurrence metadata,
//! and are used by the scheduling service and the repository ports.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::errors::CaseloadError;

/// How far apart the occurrences of a recurring series are spaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceFrequency {
    Weekly,
    Biweekly,
    #[serde(rename = "every_4_weeks")]
    EveryFourWeeks,
}

impl RecurrenceFrequency {
    /// Fixed day offset between consecutive occurrences.
    pub fn step_days(self) -> u64 {
        match self {
            Self::Weekly => 7,
            Self::Biweekly => 14,
            Self::EveryFourWeeks => 28,
        }
    }

    /// Stable string form used for storage and wire payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::EveryFourWeeks => "every_4_weeks",
        }
    }
}

impl fmt::Display for RecurrenceFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurrenceFrequency {
    type Err = CaseloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "every_4_weeks" => Ok(Self::EveryFourWeeks),
            other => Err(CaseloadError::InvalidInput(format!(
                "unknown recurrence frequency: {other}"
            ))),
        }
    }
}

/// How many occurrences an update or delete affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditScope {
    /// Only the targeted occurrence.
    Single,
    /// The targeted occurrence and every later one in the same group.
    AllFuture,
}

/// One concrete occurrence of a session on the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Practice/provider this session belongs to. Every operation is scoped
    /// to this id.
    pub owner_id: String,
    /// Externally managed client reference; stored as supplied.
    pub client_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Lifecycle tag (scheduled/completed/...), opaque to scheduling logic.
    pub status: String,
    /// Downstream EHR sync state, pass-through only.
    pub ehr_sync_status: Option<String>,
    /// Whether a progress note is attached, pass-through only.
    pub has_note: bool,
    /// Lineage id shared by all occurrences of one recurring series.
    pub recurring_group_id: Option<String>,
    /// Present only when `recurring_group_id` is present.
    pub recurring_frequency: Option<RecurrenceFrequency>,
    /// Present only alongside `recurring_frequency`.
    pub recurring_end_date: Option<NaiveDate>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Session {
    /// Whether this occurrence belongs to a recurring group.
    pub fn is_recurring(&self) -> bool {
        self.recurring_group_id.is_some()
    }
}

/// Creation payload for a session.
///
/// The recurrence fields are optional here; the recurring creation path
/// requires both of them and rejects the request otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDraft {
    pub owner_id: String,
    pub client_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ehr_sync_status: Option<String>,
    #[serde(default)]
    pub has_note: bool,
    #[serde(default)]
    pub recurring_frequency: Option<RecurrenceFrequency>,
    #[serde(default)]
    pub recurring_end_date: Option<NaiveDate>,
}

/// Update payload; every field is optional and absent fields are left
/// untouched.
///
/// The recurrence fields are honored only by the pattern-change path of an
/// all-future update. Scope-single updates never touch them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionPatch {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ehr_sync_status: Option<String>,
    #[serde(default)]
    pub has_note: Option<bool>,
    #[serde(default)]
    pub recurring_frequency: Option<RecurrenceFrequency>,
    #[serde(default)]
    pub recurring_end_date: Option<NaiveDate>,
}

impl SessionPatch {
    /// Whether applying this patch to `target` would change the occurrence
    /// date or the recurrence pattern, forcing the tail of the series to be
    /// regenerated instead of updated in place.
    pub fn changes_pattern(&self, target: &Session) -> bool {
        let date_shifted = self.date.is_some_and(|d| d != target.date);
        let frequency_changed = self
            .recurring_frequency
            .is_some_and(|f| Some(f) != target.recurring_frequency);
        let end_date_changed = self
            .recurring_end_date
            .is_some_and(|d| Some(d) != target.recurring_end_date);
        date_shifted || frequency_changed || end_date_changed
    }
}
