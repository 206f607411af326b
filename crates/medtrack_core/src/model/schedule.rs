//! Medication schedule model.
//!
//! # Responsibility
//! - Define the recurrence definition of one medication.
//! - Validate schedule invariants before they reach storage.
//!
//! # Invariants
//! - `times_of_day` is non-empty and free of duplicates for a valid schedule.
//! - `start_date <= end_date` when both are set.
//! - `days_of_week` holds weekday numbers `0..=6` with `0 = Sunday`.

use chrono::{NaiveDate, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

static TIME_OF_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").expect("valid time-of-day regex"));

/// Opaque stable medication identifier.
pub type ScheduleId = String;

/// Local wall-clock time of day with minute precision (`HH:MM`, 24h).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    /// Builds a time from hour and minute, `None` when out of range.
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Minutes elapsed since local midnight.
    pub fn minutes_since_midnight(self) -> i64 {
        i64::from(self.0.hour()) * 60 + i64::from(self.0.minute())
    }

    pub fn as_naive_time(self) -> NaiveTime {
        self.0
    }
}

impl FromStr for TimeOfDay {
    type Err = ScheduleValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let invalid = || ScheduleValidationError::InvalidTimeOfDay(trimmed.to_string());
        let caps = TIME_OF_DAY_RE.captures(trimmed).ok_or_else(invalid)?;
        let hour: u32 = caps[1].parse().map_err(|_| invalid())?;
        let minute: u32 = caps[2].parse().map_err(|_| invalid())?;
        Self::from_hm(hour, minute).ok_or_else(invalid)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ScheduleValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

/// Schedule invariant violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleValidationError {
    EmptyId,
    EmptyName,
    NoTimesOfDay,
    DuplicateTime(TimeOfDay),
    InvalidTimeOfDay(String),
    InvalidWeekday(u8),
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

impl Display for ScheduleValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "medication id must not be empty"),
            Self::EmptyName => write!(f, "medication name must not be empty"),
            Self::NoTimesOfDay => write!(f, "medication needs at least one time of day"),
            Self::DuplicateTime(time) => write!(f, "time of day listed twice: {time}"),
            Self::InvalidTimeOfDay(value) => {
                write!(f, "invalid time of day `{value}`; expected HH:MM (24h)")
            }
            Self::InvalidWeekday(value) => {
                write!(f, "invalid weekday {value}; expected 0 (Sunday) to 6 (Saturday)")
            }
            Self::InvalidDateRange { start, end } => {
                write!(f, "end date ({end}) must be >= start date ({start})")
            }
        }
    }
}

impl Error for ScheduleValidationError {}

/// Recurrence definition for one medication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationSchedule {
    pub id: ScheduleId,
    pub name: String,
    /// Free-text strength label, e.g. `500 mg`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub times_of_day: Vec<TimeOfDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Absent or empty means every day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<BTreeSet<u8>>,
    /// Every other day counted from `start_date`; ignored without a start date.
    #[serde(default, skip_serializing_if = "is_false")]
    pub alternate_days: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl MedicationSchedule {
    /// Creates a daily schedule with a generated id.
    ///
    /// Times are sorted and deduplicated.
    pub fn new(name: impl Into<String>, times_of_day: impl IntoIterator<Item = TimeOfDay>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), name, times_of_day)
    }

    /// Creates a daily schedule with a caller-provided id.
    ///
    /// Used by import paths and tests where identity already exists.
    pub fn with_id(
        id: impl Into<ScheduleId>,
        name: impl Into<String>,
        times_of_day: impl IntoIterator<Item = TimeOfDay>,
    ) -> Self {
        let times: BTreeSet<TimeOfDay> = times_of_day.into_iter().collect();
        Self {
            id: id.into(),
            name: name.into(),
            strength: None,
            notes: None,
            times_of_day: times.into_iter().collect(),
            start_date: None,
            end_date: None,
            days_of_week: None,
            alternate_days: false,
        }
    }

    /// Checks schedule invariants.
    ///
    /// # Errors
    /// - Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ScheduleValidationError> {
        if self.id.trim().is_empty() {
            return Err(ScheduleValidationError::EmptyId);
        }
        if self.name.trim().is_empty() {
            return Err(ScheduleValidationError::EmptyName);
        }
        if self.times_of_day.is_empty() {
            return Err(ScheduleValidationError::NoTimesOfDay);
        }

        let mut seen = BTreeSet::new();
        for time in &self.times_of_day {
            if !seen.insert(*time) {
                return Err(ScheduleValidationError::DuplicateTime(*time));
            }
        }

        if let Some(days) = &self.days_of_week {
            if let Some(bad) = days.iter().find(|day| **day > 6) {
                return Err(ScheduleValidationError::InvalidWeekday(*bad));
            }
        }

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(ScheduleValidationError::InvalidDateRange { start, end });
            }
        }

        Ok(())
    }

    /// Stops the medication so that `as_of` is its last active day.
    ///
    /// An earlier existing end date is kept.
    ///
    /// # Errors
    /// - Returns `InvalidDateRange` when the schedule starts after `as_of`.
    pub fn stop(&mut self, as_of: NaiveDate) -> Result<(), ScheduleValidationError> {
        if let Some(start) = self.start_date {
            if start > as_of {
                return Err(ScheduleValidationError::InvalidDateRange { start, end: as_of });
            }
        }
        self.end_date = Some(match self.end_date {
            Some(end) if end < as_of => end,
            _ => as_of,
        });
        Ok(())
    }

    /// Whether the schedule has an end date on or before `date`.
    pub fn is_stopped_by(&self, date: NaiveDate) -> bool {
        self.end_date.is_some_and(|end| end <= date)
    }
}

#[cfg(test)]
mod tests {
    use super::{MedicationSchedule, ScheduleValidationError, TimeOfDay};
    use chrono::NaiveDate;

    fn t(value: &str) -> TimeOfDay {
        value.parse().unwrap()
    }

    #[test]
    fn time_of_day_parses_strict_24h_values() {
        assert_eq!(t("08:05").minutes_since_midnight(), 485);
        assert_eq!(t("23:59").minutes_since_midnight(), 1439);
        assert_eq!(t(" 00:00 ").minutes_since_midnight(), 0);

        for bad in ["8:00", "24:00", "12:60", "12-30", "", "12:30:00"] {
            assert!(bad.parse::<TimeOfDay>().is_err(), "`{bad}` should be rejected");
        }
    }

    #[test]
    fn new_sorts_and_deduplicates_times() {
        let schedule = MedicationSchedule::new("Metformin", [t("20:00"), t("08:00"), t("20:00")]);
        assert_eq!(schedule.times_of_day, vec![t("08:00"), t("20:00")]);
        assert!(!schedule.id.is_empty());
        assert!(schedule.validate().is_ok());
    }

    #[test]
    fn validate_rejects_reversed_dates_and_bad_weekdays() {
        let mut schedule = MedicationSchedule::with_id("s1", "Aspirin", [t("09:00")]);
        schedule.start_date = NaiveDate::from_ymd_opt(2026, 3, 2);
        schedule.end_date = NaiveDate::from_ymd_opt(2026, 3, 1);
        assert!(matches!(
            schedule.validate(),
            Err(ScheduleValidationError::InvalidDateRange { .. })
        ));

        schedule.end_date = None;
        schedule.days_of_week = Some([1, 7].into_iter().collect());
        assert_eq!(
            schedule.validate(),
            Err(ScheduleValidationError::InvalidWeekday(7))
        );
    }

    #[test]
    fn validate_rejects_duplicate_times_from_raw_data() {
        let mut schedule = MedicationSchedule::with_id("s1", "Aspirin", [t("09:00")]);
        schedule.times_of_day.push(t("09:00"));
        assert_eq!(
            schedule.validate(),
            Err(ScheduleValidationError::DuplicateTime(t("09:00")))
        );
    }

    #[test]
    fn stop_keeps_earlier_end_date() {
        let day = |d| NaiveDate::from_ymd_opt(2026, 5, d).unwrap();
        let mut schedule = MedicationSchedule::with_id("s1", "Aspirin", [t("09:00")]);
        schedule.start_date = Some(day(1));

        schedule.stop(day(10)).unwrap();
        assert_eq!(schedule.end_date, Some(day(10)));
        schedule.stop(day(20)).unwrap();
        assert_eq!(schedule.end_date, Some(day(10)));
        assert!(schedule.is_stopped_by(day(10)));
        assert!(!schedule.is_stopped_by(day(9)));

        let mut future = MedicationSchedule::with_id("s2", "Later", [t("09:00")]);
        future.start_date = Some(day(15));
        assert!(future.stop(day(10)).is_err());
    }

    #[test]
    fn serialization_uses_camel_case_wire_fields() {
        let mut schedule = MedicationSchedule::with_id("s1", "Aspirin", [t("09:00")]);
        schedule.start_date = NaiveDate::from_ymd_opt(2026, 1, 1);
        schedule.days_of_week = Some([0, 6].into_iter().collect());

        let json = serde_json::to_value(&schedule).unwrap();
        assert_eq!(json["timesOfDay"][0], "09:00");
        assert_eq!(json["startDate"], "2026-01-01");
        assert_eq!(json["daysOfWeek"], serde_json::json!([0, 6]));
        assert!(json.get("endDate").is_none());

        let decoded: MedicationSchedule = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, schedule);
    }
}
