//! Recurrence resolver.
//!
//! Pure functions; the reminder scanner and the day aggregator call these on
//! every refresh, so they must stay free of side effects.

use crate::model::dose::DoseInstance;
use crate::model::schedule::{MedicationSchedule, TimeOfDay};
use chrono::{Datelike, NaiveDate};

/// Returns whether `schedule` produces doses on `date`.
///
/// Checks, in order: inclusive `start_date..=end_date` bounds, the weekday
/// filter (empty set means every day), then alternating-day parity counted
/// from `start_date`.
pub fn is_active_on(schedule: &MedicationSchedule, date: NaiveDate) -> bool {
    if schedule.start_date.is_some_and(|start| date < start) {
        return false;
    }
    if schedule.end_date.is_some_and(|end| date > end) {
        return false;
    }

    if let Some(days) = schedule.days_of_week.as_ref().filter(|days| !days.is_empty()) {
        let weekday = date.weekday().num_days_from_sunday() as u8;
        if !days.contains(&weekday) {
            return false;
        }
    }

    match (schedule.alternate_days, schedule.start_date) {
        (true, Some(start)) => (date - start).num_days() % 2 == 0,
        _ => true,
    }
}

/// Returns the time slots of `schedule` on `date`, empty when inactive.
pub fn slots_on(schedule: &MedicationSchedule, date: NaiveDate) -> Vec<TimeOfDay> {
    if is_active_on(schedule, date) {
        schedule.times_of_day.clone()
    } else {
        Vec::new()
    }
}

/// Expands `schedule` into its dose instances on `date`.
pub fn dose_instances_on(schedule: &MedicationSchedule, date: NaiveDate) -> Vec<DoseInstance> {
    slots_on(schedule, date)
        .into_iter()
        .map(|time| DoseInstance {
            schedule_id: schedule.id.clone(),
            date,
            time,
        })
        .collect()
}
