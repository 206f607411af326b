//! Tracker use-case service.
//!
//! # Responsibility
//! - Own the in-memory tracker state (schedules, dose logs, settings,
//!   reminder scanner) as one explicit store object.
//! - Persist the whole document after every successful mutation.
//! - A mutation whose save fails leaves memory exactly as it was.
//!
//! # Invariants
//! - Dose mutations pass `ensure_editable` before touching the store; a
//!   rejected call changes nothing.
//! - Import validates the complete document before replacing any state.
//! - Medications are stopped, never deleted, so history stays resolvable.

use crate::aggregate::day_stats::{self, DayStats};
use crate::clock::Clock;
use crate::model::app_data::AppData;
use crate::model::dose::{DayLog, DoseRecord, DoseStatus};
use crate::model::schedule::{MedicationSchedule, ScheduleValidationError, TimeOfDay};
use crate::model::settings::{LeadTime, Settings};
use crate::reminder::scanner::{ReminderEvent, ReminderScanner};
use crate::repo::data_repo::{DataRepository, RepoError};
use crate::schedule::gate::{ensure_editable, is_editable, NotEditable};
use crate::schedule::recurrence::{is_active_on, slots_on};
use crate::store::dose_log::DoseLogStore;
use crate::transfer::document::{export_document, parse_import_document, ImportError};
use chrono::NaiveDate;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Service error for tracker use-cases.
#[derive(Debug)]
pub enum TrackerError {
    /// Schedule input violates model invariants.
    Validation(ScheduleValidationError),
    /// Mutation attempted on a date other than today.
    NotEditable(NotEditable),
    MedicationNotFound(String),
    DuplicateMedication(String),
    /// The medication has no dose at this time on this date.
    DoseNotScheduled {
        schedule_id: String,
        date: NaiveDate,
        time: TimeOfDay,
    },
    /// Bulk slot action on a slot with no scheduled medication.
    EmptySlot { date: NaiveDate, time: TimeOfDay },
    Import(ImportError),
    Export(serde_json::Error),
    Repo(RepoError),
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotEditable(err) => write!(f, "{err}"),
            Self::MedicationNotFound(id) => write!(f, "medication not found: {id}"),
            Self::DuplicateMedication(id) => write!(f, "medication already exists: {id}"),
            Self::DoseNotScheduled {
                schedule_id,
                date,
                time,
            } => write!(f, "medication {schedule_id} has no dose at {time} on {date}"),
            Self::EmptySlot { date, time } => {
                write!(f, "no medication is scheduled at {time} on {date}")
            }
            Self::Import(err) => write!(f, "{err}"),
            Self::Export(err) => write!(f, "failed to export tracker data: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TrackerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotEditable(err) => Some(err),
            Self::Import(err) => Some(err),
            Self::Export(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::MedicationNotFound(_)
            | Self::DuplicateMedication(_)
            | Self::DoseNotScheduled { .. }
            | Self::EmptySlot { .. } => None,
        }
    }
}

impl From<ScheduleValidationError> for TrackerError {
    fn from(value: ScheduleValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<NotEditable> for TrackerError {
    fn from(value: NotEditable) -> Self {
        Self::NotEditable(value)
    }
}

impl From<ImportError> for TrackerError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

impl From<RepoError> for TrackerError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Result of a bulk slot toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotToggle {
    /// Status applied to every dose in the slot.
    pub applied: DoseStatus,
    pub doses: usize,
}

/// Tracker facade over a persistence provider and a clock.
pub struct TrackerService<R: DataRepository, C: Clock> {
    repo: R,
    clock: C,
    medications: Vec<MedicationSchedule>,
    store: DoseLogStore,
    settings: Settings,
    scanner: ReminderScanner,
}

impl<R: DataRepository, C: Clock> TrackerService<R, C> {
    /// Loads persisted data and builds the service.
    ///
    /// Unreadable data starts the tracker from a clean slate.
    pub fn open(repo: R, clock: C) -> Self {
        let data = repo.load_all_data();
        info!(
            "event=tracker_open module=service status=ok medications={} day_logs={}",
            data.medications.len(),
            data.day_logs.len()
        );
        Self {
            repo,
            clock,
            medications: data.medications,
            store: DoseLogStore::from_logs(data.day_logs),
            settings: data.settings,
            scanner: ReminderScanner::new(),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Snapshot of the full tracker document.
    pub fn snapshot(&self) -> AppData {
        AppData {
            medications: self.medications.clone(),
            day_logs: self.store.to_logs(),
            settings: self.settings,
        }
    }

    /// Applies `mutate` and saves the result, or restores the previous
    /// state when either step fails.
    ///
    /// Nothing is written when `mutate` leaves the state unchanged.
    fn commit<T>(
        &mut self,
        operation: &str,
        mutate: impl FnOnce(&mut Self) -> TrackerResult<T>,
    ) -> TrackerResult<T> {
        let medications = self.medications.clone();
        let store = self.store.clone();
        let settings = self.settings;

        let result = mutate(self).and_then(|value| {
            let changed = self.medications != medications
                || self.store != store
                || self.settings != settings;
            if changed {
                self.repo.save_all_data(&self.snapshot())?;
            }
            Ok(value)
        });

        if let Err(err) = &result {
            self.medications = medications;
            self.store = store;
            self.settings = settings;
            warn!(
                "event=state_rollback module=service status=error operation={} error={}",
                operation, err
            );
        }
        result
    }

    // ---- medications -------------------------------------------------

    pub fn medications(&self) -> &[MedicationSchedule] {
        &self.medications
    }

    pub fn medication(&self, id: &str) -> Option<&MedicationSchedule> {
        self.medications.iter().find(|medication| medication.id == id)
    }

    /// Medications producing doses on `date`.
    pub fn active_medications(&self, date: NaiveDate) -> Vec<&MedicationSchedule> {
        self.medications
            .iter()
            .filter(|medication| is_active_on(medication, date))
            .collect()
    }

    pub fn add_medication(&mut self, medication: MedicationSchedule) -> TrackerResult<()> {
        medication.validate()?;
        if self.medication(&medication.id).is_some() {
            return Err(TrackerError::DuplicateMedication(medication.id));
        }

        let schedule_id = medication.id.clone();
        let slots = medication.times_of_day.len();
        self.commit("add_medication", |service| {
            service.medications.push(medication);
            Ok(())
        })?;
        info!(
            "event=medication_add module=service status=ok schedule_id={} slots={}",
            schedule_id, slots
        );
        Ok(())
    }

    /// Replaces an existing medication definition by id.
    pub fn update_medication(&mut self, medication: MedicationSchedule) -> TrackerResult<()> {
        medication.validate()?;
        let index = self
            .medications
            .iter()
            .position(|existing| existing.id == medication.id)
            .ok_or_else(|| TrackerError::MedicationNotFound(medication.id.clone()))?;

        let schedule_id = medication.id.clone();
        self.commit("update_medication", |service| {
            service.medications[index] = medication;
            Ok(())
        })?;
        info!(
            "event=medication_update module=service status=ok schedule_id={}",
            schedule_id
        );
        Ok(())
    }

    /// Ends a medication so that today is its last active day.
    pub fn stop_medication(&mut self, id: &str) -> TrackerResult<()> {
        let today = self.today();
        let index = self
            .medications
            .iter()
            .position(|medication| medication.id == id)
            .ok_or_else(|| TrackerError::MedicationNotFound(id.to_string()))?;

        self.commit("stop_medication", |service| {
            service.medications[index].stop(today)?;
            Ok(())
        })?;
        info!(
            "event=medication_stop module=service status=ok schedule_id={} end_date={}",
            id, today
        );
        Ok(())
    }

    // ---- day logs ----------------------------------------------------

    pub fn is_editable(&self, date: NaiveDate) -> bool {
        is_editable(date, &self.clock)
    }

    /// Day log for `date`, materialized from current schedules on first view.
    pub fn day_log(&mut self, date: NaiveDate) -> TrackerResult<DayLog> {
        self.commit("day_log", |service| {
            service.store.materialize(date, &service.medications);
            Ok(())
        })?;
        Ok(self
            .store
            .get_day_log(date)
            .cloned()
            .unwrap_or_else(|| DayLog::new(date)))
    }

    /// Day log for `date` without materializing anything.
    pub fn peek_day_log(&self, date: NaiveDate) -> Option<&DayLog> {
        self.store.get_day_log(date)
    }

    pub fn dose_status(&self, date: NaiveDate, schedule_id: &str, time: TimeOfDay) -> DoseStatus {
        self.store.dose_status(date, schedule_id, time)
    }

    /// Sets one dose status. Only today's doses can change.
    pub fn set_dose_status(
        &mut self,
        date: NaiveDate,
        schedule_id: &str,
        time: TimeOfDay,
        status: DoseStatus,
    ) -> TrackerResult<DoseRecord> {
        self.gate(date, "set_dose_status")?;
        self.ensure_dose_exists(date, schedule_id, time)?;

        let now = self.clock.now();
        let record = self.commit("set_dose_status", |service| {
            Ok(service
                .store
                .update_dose_status(date, schedule_id, time, status, now)
                .clone())
        })?;
        info!(
            "event=dose_update module=service status=ok date={} schedule_id={} time={} dose_status={}",
            date, schedule_id, time, record.status
        );
        Ok(record)
    }

    /// Flips one dose: `Taken` becomes `Pending`, anything else `Taken`.
    pub fn toggle_dose(
        &mut self,
        date: NaiveDate,
        schedule_id: &str,
        time: TimeOfDay,
    ) -> TrackerResult<DoseRecord> {
        let next = match self.store.dose_status(date, schedule_id, time) {
            DoseStatus::Taken => DoseStatus::Pending,
            DoseStatus::Pending | DoseStatus::Skipped => DoseStatus::Taken,
        };
        self.set_dose_status(date, schedule_id, time, next)
    }

    /// Toggles every dose in one slot together.
    ///
    /// A complete slot goes back to `Pending`; otherwise every dose becomes
    /// `Taken`.
    pub fn toggle_slot(&mut self, date: NaiveDate, time: TimeOfDay) -> TrackerResult<SlotToggle> {
        self.gate(date, "toggle_slot")?;

        let ids: Vec<String> = day_stats::schedules_in_slot(date, &self.medications, time)
            .into_iter()
            .map(|schedule| schedule.id.clone())
            .collect();
        if ids.is_empty() {
            return Err(TrackerError::EmptySlot { date, time });
        }

        let applied = if day_stats::slot_completion(date, &self.medications, &self.store, time) {
            DoseStatus::Pending
        } else {
            DoseStatus::Taken
        };
        let now = self.clock.now();
        self.commit("toggle_slot", |service| {
            for id in &ids {
                service.store.update_dose_status(date, id, time, applied, now);
            }
            Ok(())
        })?;

        info!(
            "event=slot_toggle module=service status=ok date={} time={} dose_status={} doses={}",
            date,
            time,
            applied,
            ids.len()
        );
        Ok(SlotToggle {
            applied,
            doses: ids.len(),
        })
    }

    fn gate(&self, date: NaiveDate, operation: &str) -> TrackerResult<()> {
        ensure_editable(date, &self.clock).map_err(|err| {
            warn!(
                "event=edit_rejected module=service status=rejected operation={} date={} today={}",
                operation, err.date, err.today
            );
            TrackerError::from(err)
        })
    }

    fn ensure_dose_exists(
        &self,
        date: NaiveDate,
        schedule_id: &str,
        time: TimeOfDay,
    ) -> TrackerResult<()> {
        let schedule = self
            .medication(schedule_id)
            .ok_or_else(|| TrackerError::MedicationNotFound(schedule_id.to_string()))?;
        let recorded = self
            .store
            .get_day_log(date)
            .is_some_and(|log| log.find(schedule_id, time).is_some());

        if recorded || slots_on(schedule, date).contains(&time) {
            Ok(())
        } else {
            Err(TrackerError::DoseNotScheduled {
                schedule_id: schedule_id.to_string(),
                date,
                time,
            })
        }
    }

    // ---- statistics --------------------------------------------------

    pub fn day_stats(&self, date: NaiveDate) -> DayStats {
        day_stats::day_stats(date, &self.medications, &self.store)
    }

    pub fn slot_completion(&self, date: NaiveDate, time: TimeOfDay) -> bool {
        day_stats::slot_completion(date, &self.medications, &self.store, time)
    }

    pub fn slots_for_day(&self, date: NaiveDate) -> Vec<TimeOfDay> {
        day_stats::slots_for_day(date, &self.medications)
    }

    pub fn range_stats(&self, start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, DayStats)> {
        day_stats::range_stats(start, end, &self.medications, &self.store)
    }

    // ---- settings and reminders --------------------------------------

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn set_reminders_enabled(&mut self, enabled: bool) -> TrackerResult<()> {
        self.commit("set_reminders_enabled", |service| {
            service.settings.reminders_enabled = enabled;
            Ok(())
        })?;
        info!(
            "event=settings_update module=service status=ok reminders_enabled={}",
            enabled
        );
        Ok(())
    }

    pub fn set_lead_time(&mut self, lead_time: LeadTime) -> TrackerResult<()> {
        self.commit("set_lead_time", |service| {
            service.settings.lead_time_minutes = lead_time;
            Ok(())
        })?;
        info!(
            "event=settings_update module=service status=ok lead_time_minutes={}",
            lead_time.minutes()
        );
        Ok(())
    }

    /// Runs one reminder scan at the clock's current time.
    pub fn scan_reminders(&mut self) -> Vec<ReminderEvent> {
        self.scanner.scan(
            self.clock.now(),
            &self.medications,
            &self.store,
            &self.settings,
        )
    }

    /// Midnight reset of the notified-dose set.
    pub fn reset_notified(&mut self) {
        self.scanner.reset_notified();
    }

    pub fn scanner(&self) -> &ReminderScanner {
        &self.scanner
    }

    // ---- import / export / reset -------------------------------------

    pub fn export_json(&self) -> TrackerResult<String> {
        export_document(&self.snapshot(), self.clock.now()).map_err(TrackerError::Export)
    }

    /// Replaces all tracker data with a validated import document.
    ///
    /// Last write wins; nothing changes when validation fails.
    pub fn import_json(&mut self, text: &str) -> TrackerResult<()> {
        let data = parse_import_document(text).map_err(|err| {
            warn!(
                "event=data_import module=service status=rejected error={}",
                err
            );
            TrackerError::from(err)
        })?;

        self.repo.save_all_data(&data)?;
        info!(
            "event=data_import module=service status=ok medications={} day_logs={}",
            data.medications.len(),
            data.day_logs.len()
        );
        self.medications = data.medications;
        self.store = DoseLogStore::from_logs(data.day_logs);
        self.settings = data.settings;
        Ok(())
    }

    /// Clears every medication, log and setting.
    pub fn reset_all_data(&mut self) -> TrackerResult<()> {
        self.repo.save_all_data(&AppData::default())?;
        self.medications.clear();
        self.store.clear();
        self.settings = Settings::default();
        self.scanner.reset_notified();
        info!("event=data_reset module=service status=ok");
        Ok(())
    }
}
