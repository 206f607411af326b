//! Core domain logic for MedTrack.
//! This crate is the single source of truth for schedule and dose invariants.

pub mod aggregate;
pub mod clock;
pub mod db;
pub mod logging;
pub mod model;
pub mod reminder;
pub mod repo;
pub mod schedule;
pub mod service;
pub mod store;
pub mod transfer;

pub use aggregate::day_stats::{day_stats, range_stats, slot_completion, slots_for_day, DayStats};
pub use clock::{Clock, FixedClock, SystemClock};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::app_data::AppData;
pub use model::dose::{DayLog, DoseInstance, DoseKey, DoseRecord, DoseStatus};
pub use model::schedule::{MedicationSchedule, ScheduleId, ScheduleValidationError, TimeOfDay};
pub use model::settings::{LeadTime, Settings, UnsupportedLeadTime};
pub use reminder::scanner::{ReminderEvent, ReminderScanner};
pub use reminder::scheduler::{ReminderScheduler, SCAN_INTERVAL};
pub use reminder::sink::{CollectingSink, LogNotificationSink, NotificationSink};
pub use repo::data_repo::{
    DataRepository, MemoryDataRepository, RepoError, RepoResult, SqliteDataRepository,
};
pub use schedule::gate::{ensure_editable, is_editable, NotEditable};
pub use schedule::recurrence::{dose_instances_on, is_active_on, slots_on};
pub use service::tracker_service::{SlotToggle, TrackerError, TrackerResult, TrackerService};
pub use store::dose_log::DoseLogStore;
pub use transfer::document::{check_day_logs, export_document, parse_import_document, ImportError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
