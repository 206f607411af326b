//! Schedule resolution.
//!
//! # Responsibility
//! - Expand medication recurrence rules onto concrete calendar dates.
//! - Decide which dates may still be edited.
//!
//! # Invariants
//! - Resolution is a pure function of `(schedule, date)`.
//! - Only the current local calendar date is editable.

pub mod gate;
pub mod recurrence;
