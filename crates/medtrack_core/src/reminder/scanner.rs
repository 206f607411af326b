//! Reminder scanner.
//!
//! One scan looks only at "today": for every active slot it checks the
//! half-open window `[dose - lead, dose)` against the current minute. Doses
//! early in the morning get a window starting before midnight; only the part
//! on today's date can ever match, there is no wraparound into yesterday.

use crate::model::dose::DoseKey;
use crate::model::schedule::{MedicationSchedule, ScheduleId, TimeOfDay};
use crate::model::settings::Settings;
use crate::schedule::recurrence::slots_on;
use crate::store::dose_log::DoseLogStore;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use log::{debug, info, warn};
use std::collections::HashSet;

/// One dose coming due soon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderEvent {
    pub schedule_id: ScheduleId,
    pub name: String,
    pub date: NaiveDate,
    pub time: TimeOfDay,
    pub minutes_until_dose: i64,
}

impl ReminderEvent {
    pub fn key(&self) -> DoseKey {
        DoseKey::new(self.date, &self.schedule_id, self.time)
    }
}

/// Process-lifetime reminder state.
#[derive(Debug, Default)]
pub struct ReminderScanner {
    notified: HashSet<DoseKey>,
}

impl ReminderScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one scan cycle and marks every emitted dose as notified.
    ///
    /// # Contract
    /// - Disabled reminders or an empty schedule set emit nothing.
    /// - A dose qualifies when `dose - lead <= now < dose`, its key was not
    ///   notified yet and its recorded status is still `Pending`.
    /// - Schedules failing validation are skipped; the cycle continues.
    pub fn scan(
        &mut self,
        now: NaiveDateTime,
        schedules: &[MedicationSchedule],
        store: &DoseLogStore,
        settings: &Settings,
    ) -> Vec<ReminderEvent> {
        if !settings.reminders_enabled || schedules.is_empty() {
            return Vec::new();
        }

        let today = now.date();
        let now_minutes = i64::from(now.hour()) * 60 + i64::from(now.minute());
        let lead = i64::from(settings.lead_time_minutes.minutes());
        let mut events = Vec::new();
        let mut skipped = 0usize;

        for schedule in schedules {
            if let Err(err) = schedule.validate() {
                skipped += 1;
                warn!(
                    "event=reminder_scan_skip module=reminder status=error schedule_id={} error={}",
                    schedule.id, err
                );
                continue;
            }

            for time in slots_on(schedule, today) {
                let dose_minutes = time.minutes_since_midnight();
                let window_start = dose_minutes - lead;
                if now_minutes < window_start || now_minutes >= dose_minutes {
                    continue;
                }

                let key = DoseKey::new(today, &schedule.id, time);
                if self.notified.contains(&key) {
                    continue;
                }
                if !store.dose_status(today, &schedule.id, time).is_open() {
                    continue;
                }

                self.notified.insert(key);
                events.push(ReminderEvent {
                    schedule_id: schedule.id.clone(),
                    name: schedule.name.clone(),
                    date: today,
                    time,
                    minutes_until_dose: dose_minutes - now_minutes,
                });
            }
        }

        if events.is_empty() {
            debug!(
                "event=reminder_scan module=reminder status=ok date={} due=0 skipped={}",
                today, skipped
            );
        } else {
            info!(
                "event=reminder_scan module=reminder status=ok date={} due={} skipped={}",
                today,
                events.len(),
                skipped
            );
        }
        events
    }

    pub fn is_notified(&self, key: &DoseKey) -> bool {
        self.notified.contains(key)
    }

    pub fn notified_count(&self) -> usize {
        self.notified.len()
    }

    /// Daily reset fired at local midnight.
    pub fn reset_notified(&mut self) {
        let cleared = self.notified.len();
        self.notified.clear();
        info!(
            "event=reminder_reset module=reminder status=ok cleared={}",
            cleared
        );
    }
}
