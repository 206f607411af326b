//! Day aggregator.
//!
//! # Responsibility
//! - Count scheduled and taken doses per day.
//! - Decide whether a whole time slot is complete.
//!
//! # Invariants
//! - `total` comes from schedules active on the date.
//! - `taken` comes from recorded history, including records of schedules
//!   that are no longer active; history is never filtered retroactively.
//! - Aggregation never materializes day logs.

use crate::model::dose::DoseStatus;
use crate::model::schedule::{MedicationSchedule, TimeOfDay};
use crate::schedule::recurrence::slots_on;
use crate::store::dose_log::DoseLogStore;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Per-day dose counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayStats {
    pub total: usize,
    pub taken: usize,
    pub skipped: usize,
}

impl DayStats {
    /// Taken share of scheduled doses in `0.0..=1.0`; `None` on days with
    /// nothing scheduled.
    pub fn completion_ratio(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some((self.taken as f64 / self.total as f64).min(1.0))
    }
}

pub fn day_stats(
    date: NaiveDate,
    schedules: &[MedicationSchedule],
    store: &DoseLogStore,
) -> DayStats {
    let total = schedules
        .iter()
        .map(|schedule| slots_on(schedule, date).len())
        .sum();

    let (taken, skipped) = store.get_day_log(date).map_or((0, 0), |log| {
        (
            log.count_with_status(DoseStatus::Taken),
            log.count_with_status(DoseStatus::Skipped),
        )
    });

    DayStats {
        total,
        taken,
        skipped,
    }
}

/// Schedules whose slots on `date` include `time`.
pub fn schedules_in_slot<'a>(
    date: NaiveDate,
    schedules: &'a [MedicationSchedule],
    time: TimeOfDay,
) -> Vec<&'a MedicationSchedule> {
    schedules
        .iter()
        .filter(|schedule| slots_on(schedule, date).contains(&time))
        .collect()
}

/// True iff every schedule due at `time` on `date` has a `Taken` record.
///
/// An empty slot is trivially complete.
pub fn slot_completion(
    date: NaiveDate,
    schedules: &[MedicationSchedule],
    store: &DoseLogStore,
    time: TimeOfDay,
) -> bool {
    schedules_in_slot(date, schedules, time)
        .into_iter()
        .all(|schedule| store.dose_status(date, &schedule.id, time) == DoseStatus::Taken)
}

/// Ordered union of active slots on `date`.
pub fn slots_for_day(date: NaiveDate, schedules: &[MedicationSchedule]) -> Vec<TimeOfDay> {
    schedules
        .iter()
        .flat_map(|schedule| slots_on(schedule, date))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// `day_stats` for every date in `start..=end`.
pub fn range_stats(
    start: NaiveDate,
    end: NaiveDate,
    schedules: &[MedicationSchedule],
    store: &DoseLogStore,
) -> Vec<(NaiveDate, DayStats)> {
    start
        .iter_days()
        .take_while(|date| *date <= end)
        .map(|date| (date, day_stats(date, schedules, store)))
        .collect()
}
