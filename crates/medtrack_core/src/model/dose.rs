//! Dose status, records and day logs.
//!
//! # Responsibility
//! - Define persisted dose state (`DoseRecord`, `DayLog`).
//! - Define derived identities (`DoseInstance`, `DoseKey`).
//!
//! # Invariants
//! - `(date, schedule_id, time)` is unique across all records.
//! - `taken_at` is set if and only if `status == Taken`.

use crate::model::schedule::{ScheduleId, TimeOfDay};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Status of one dose instance. `Pending` is the implicit default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DoseStatus {
    #[default]
    Pending,
    Taken,
    Skipped,
}

impl DoseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Taken => "Taken",
            Self::Skipped => "Skipped",
        }
    }

    /// Whether the dose still needs attention.
    pub fn is_open(self) -> bool {
        match self {
            Self::Pending => true,
            Self::Taken | Self::Skipped => false,
        }
    }
}

impl Display for DoseStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One schedule expanded onto a concrete date and time. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DoseInstance {
    pub schedule_id: ScheduleId,
    pub date: NaiveDate,
    pub time: TimeOfDay,
}

impl DoseInstance {
    pub fn key(&self) -> DoseKey {
        DoseKey::new(self.date, &self.schedule_id, self.time)
    }
}

/// Date-qualified dose identity, rendered as `date|schedule_id|time`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DoseKey(String);

impl DoseKey {
    pub fn new(date: NaiveDate, schedule_id: &str, time: TimeOfDay) -> Self {
        Self(format!("{date}|{schedule_id}|{time}"))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for DoseKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted status of one dose instance within a day log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoseRecord {
    pub schedule_id: ScheduleId,
    pub time: TimeOfDay,
    pub status: DoseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<NaiveDateTime>,
}

impl DoseRecord {
    pub fn pending(schedule_id: impl Into<ScheduleId>, time: TimeOfDay) -> Self {
        Self {
            schedule_id: schedule_id.into(),
            time,
            status: DoseStatus::Pending,
            taken_at: None,
        }
    }

    /// Overwrites status; `taken_at` follows it.
    pub fn set_status(&mut self, status: DoseStatus, at: NaiveDateTime) {
        self.status = status;
        self.taken_at = match status {
            DoseStatus::Taken => Some(at),
            DoseStatus::Pending | DoseStatus::Skipped => None,
        };
    }

    /// Whether `taken_at` is present exactly when the dose is `Taken`.
    pub fn taken_at_consistent(&self) -> bool {
        (self.status == DoseStatus::Taken) == self.taken_at.is_some()
    }

    pub fn matches(&self, schedule_id: &str, time: TimeOfDay) -> bool {
        self.schedule_id == schedule_id && self.time == time
    }
}

/// All dose records for one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayLog {
    pub date: NaiveDate,
    #[serde(default)]
    pub doses: Vec<DoseRecord>,
}

impl DayLog {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            doses: Vec::new(),
        }
    }

    pub fn find(&self, schedule_id: &str, time: TimeOfDay) -> Option<&DoseRecord> {
        self.doses.iter().find(|dose| dose.matches(schedule_id, time))
    }

    pub fn find_mut(&mut self, schedule_id: &str, time: TimeOfDay) -> Option<&mut DoseRecord> {
        self.doses
            .iter_mut()
            .find(|dose| dose.matches(schedule_id, time))
    }

    pub fn count_with_status(&self, status: DoseStatus) -> usize {
        self.doses.iter().filter(|dose| dose.status == status).count()
    }
}
