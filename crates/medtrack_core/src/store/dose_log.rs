//! Dose log store.

use crate::model::dose::{DayLog, DoseRecord, DoseStatus};
use crate::model::schedule::{MedicationSchedule, TimeOfDay};
use crate::schedule::recurrence::slots_on;
use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use std::collections::BTreeMap;

/// Sparse, date-keyed collection of day logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoseLogStore {
    logs: BTreeMap<NaiveDate, DayLog>,
}

impl DoseLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from persisted logs.
    ///
    /// Logs sharing a date are merged; the first record for a
    /// `(schedule, time)` pair wins.
    pub fn from_logs(logs: impl IntoIterator<Item = DayLog>) -> Self {
        let mut store = Self::new();
        for log in logs {
            let entry = store
                .logs
                .entry(log.date)
                .or_insert_with(|| DayLog::new(log.date));
            for dose in log.doses {
                if entry.find(&dose.schedule_id, dose.time).is_none() {
                    entry.doses.push(dose);
                }
            }
        }
        store
    }

    /// Returns all logs ordered by date.
    pub fn to_logs(&self) -> Vec<DayLog> {
        self.logs.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    /// Pure read; never materializes.
    pub fn get_day_log(&self, date: NaiveDate) -> Option<&DayLog> {
        self.logs.get(&date)
    }

    /// Returns the log for `date`, materializing pending records first.
    ///
    /// # Contract
    /// - Absent log: one `Pending` record per active `(schedule, time)`.
    /// - Present log: only missing active pairs are appended; existing
    ///   records, including those of schedules no longer active, are kept.
    /// - Repeated calls without mutation return identical contents.
    pub fn get_or_create_day_log(
        &mut self,
        date: NaiveDate,
        schedules: &[MedicationSchedule],
    ) -> &DayLog {
        self.materialize(date, schedules);
        self.logs.entry(date).or_insert_with(|| DayLog::new(date))
    }

    /// Ensures the log for `date` exists and covers every active slot.
    ///
    /// Returns the number of records added.
    pub fn materialize(&mut self, date: NaiveDate, schedules: &[MedicationSchedule]) -> usize {
        let created = !self.logs.contains_key(&date);
        let log = self.logs.entry(date).or_insert_with(|| DayLog::new(date));

        let mut added = 0;
        for schedule in schedules {
            for time in slots_on(schedule, date) {
                if log.find(&schedule.id, time).is_none() {
                    log.doses.push(DoseRecord::pending(schedule.id.clone(), time));
                    added += 1;
                }
            }
        }

        if created || added > 0 {
            debug!(
                "event=day_log_materialize module=store status=ok date={} created={} added={}",
                date, created, added
            );
        }
        added
    }

    /// Upserts one dose record.
    ///
    /// Creates the day log when needed. `taken_at` is set to `at` only for
    /// `Taken` and cleared otherwise.
    pub fn update_dose_status(
        &mut self,
        date: NaiveDate,
        schedule_id: &str,
        time: TimeOfDay,
        status: DoseStatus,
        at: NaiveDateTime,
    ) -> &DoseRecord {
        let log = self.logs.entry(date).or_insert_with(|| DayLog::new(date));
        let index = match log.doses.iter().position(|dose| dose.matches(schedule_id, time)) {
            Some(index) => index,
            None => {
                log.doses.push(DoseRecord::pending(schedule_id, time));
                log.doses.len() - 1
            }
        };

        let record = &mut log.doses[index];
        record.set_status(status, at);
        record
    }

    /// Status of one dose instance; `Pending` when nothing is recorded.
    pub fn dose_status(&self, date: NaiveDate, schedule_id: &str, time: TimeOfDay) -> DoseStatus {
        self.get_day_log(date)
            .and_then(|log| log.find(schedule_id, time))
            .map_or(DoseStatus::Pending, |dose| dose.status)
    }

    /// Logs with `start <= date <= end`, ordered by date.
    pub fn day_logs_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<&DayLog> {
        if start > end {
            return Vec::new();
        }
        self.logs.range(start..=end).map(|(_, log)| log).collect()
    }

    /// Drops every log.
    pub fn clear(&mut self) {
        self.logs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::DoseLogStore;
    use crate::model::dose::{DayLog, DoseRecord, DoseStatus};
    use crate::model::schedule::{MedicationSchedule, TimeOfDay};
    use chrono::{NaiveDate, NaiveDateTime};

    fn t(value: &str) -> TimeOfDay {
        value.parse().unwrap()
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        d(day).and_hms_opt(hour, 0, 0).unwrap()
    }

    fn schedules() -> Vec<MedicationSchedule> {
        let mut later = MedicationSchedule::with_id("s2", "Vitamin D", [t("12:00")]);
        later.start_date = Some(d(10));
        vec![
            MedicationSchedule::with_id("s1", "Metformin", [t("08:00"), t("20:00")]),
            later,
        ]
    }

    #[test]
    fn get_day_log_never_materializes() {
        let store = DoseLogStore::new();
        assert!(store.get_day_log(d(1)).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn get_or_create_materializes_only_active_slots() {
        let mut store = DoseLogStore::new();
        let log = store.get_or_create_day_log(d(5), &schedules()).clone();

        assert_eq!(log.doses.len(), 2);
        assert!(log.doses.iter().all(|dose| dose.status == DoseStatus::Pending));
        assert!(log.find("s2", t("12:00")).is_none());
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let mut store = DoseLogStore::new();
        let first = store.get_or_create_day_log(d(12), &schedules()).clone();
        let second = store.get_or_create_day_log(d(12), &schedules()).clone();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(second.doses.len(), 3);
    }

    #[test]
    fn get_or_create_keeps_touched_records_and_adds_new_schedules() {
        let mut store = DoseLogStore::new();
        let mut current = schedules();
        store.get_or_create_day_log(d(12), &current);
        store.update_dose_status(d(12), "s1", t("08:00"), DoseStatus::Taken, at(12, 8));

        current.push(MedicationSchedule::with_id("s3", "Iron", [t("09:00")]));
        let log = store.get_or_create_day_log(d(12), &current);

        assert_eq!(log.doses.len(), 4);
        assert_eq!(log.find("s1", t("08:00")).unwrap().status, DoseStatus::Taken);
        assert_eq!(log.find("s3", t("09:00")).unwrap().status, DoseStatus::Pending);
    }

    #[test]
    fn update_dose_status_upserts_and_tracks_taken_at() {
        let mut store = DoseLogStore::new();

        let record = store.update_dose_status(d(3), "s1", t("08:00"), DoseStatus::Taken, at(3, 8));
        assert_eq!(record.taken_at, Some(at(3, 8)));
        assert_eq!(store.get_day_log(d(3)).unwrap().doses.len(), 1);

        store.update_dose_status(d(3), "s1", t("08:00"), DoseStatus::Pending, at(3, 9));
        let log = store.get_day_log(d(3)).unwrap();
        assert_eq!(log.doses.len(), 1);
        assert_eq!(log.doses[0].status, DoseStatus::Pending);
        assert_eq!(log.doses[0].taken_at, None);
    }

    #[test]
    fn dose_status_defaults_to_pending() {
        let mut store = DoseLogStore::new();
        assert_eq!(store.dose_status(d(1), "s1", t("08:00")), DoseStatus::Pending);

        store.update_dose_status(d(1), "s1", t("08:00"), DoseStatus::Skipped, at(1, 8));
        assert_eq!(store.dose_status(d(1), "s1", t("08:00")), DoseStatus::Skipped);
    }

    #[test]
    fn range_query_is_inclusive_and_ordered() {
        let mut store = DoseLogStore::new();
        for day in [7, 2, 5, 9] {
            store.get_or_create_day_log(d(day), &schedules());
        }

        let dates: Vec<_> = store
            .day_logs_in_range(d(2), d(7))
            .into_iter()
            .map(|log| log.date)
            .collect();
        assert_eq!(dates, vec![d(2), d(5), d(7)]);
        assert!(store.day_logs_in_range(d(7), d(2)).is_empty());
    }

    #[test]
    fn from_logs_merges_duplicate_dates() {
        let mut first = DayLog::new(d(1));
        first.doses.push(DoseRecord::pending("s1", t("08:00")));
        let mut second = DayLog::new(d(1));
        second.doses.push(DoseRecord::pending("s1", t("08:00")));
        second.doses.push(DoseRecord::pending("s1", t("20:00")));

        let store = DoseLogStore::from_logs([first, second]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_day_log(d(1)).unwrap().doses.len(), 2);
    }
}
