//! Domain model for medication schedules and dose history.
//!
//! # Responsibility
//! - Define the persisted shapes (`MedicationSchedule`, `DayLog`, `Settings`).
//! - Define derived shapes that are never stored (`DoseInstance`, `DoseKey`).
//!
//! # Invariants
//! - Dose status is a closed enum; unknown values fail at deserialization.
//! - A `DoseRecord` carries `taken_at` if and only if it is `Taken`.
//! - Stopping a medication moves `end_date`; schedules are never hard-deleted
//!   by core use-cases, so history stays queryable.

pub mod app_data;
pub mod dose;
pub mod schedule;
pub mod settings;
