//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

/// Hard cap on the number of occurrences a single recurrence request may
/// generate. Guards against runaway generation from a mistaken end date.
pub const MAX_OCCURRENCES: usize = 100;

/// Session status assigned to freshly created occurrences.
pub const DEFAULT_SESSION_STATUS: &str = "scheduled";
