//! In-memory dose log storage.
//!
//! # Responsibility
//! - Hold the sparse date-keyed collection of day logs.
//! - Materialize pending records from schedules on first view.
//!
//! # Invariants
//! - At most one `DayLog` per date and one record per `(schedule, time)`.
//! - The store performs no editability checks; callers gate mutations.

pub mod dose_log;
