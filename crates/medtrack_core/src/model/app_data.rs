//! Whole-application data document exchanged with the persistence provider.

use crate::model::dose::DayLog;
use crate::model::schedule::MedicationSchedule;
use crate::model::settings::Settings;
use serde::{Deserialize, Serialize};

/// Everything the tracker persists.
///
/// Missing sections deserialize to their empty defaults so that partially
/// written data still loads.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppData {
    pub medications: Vec<MedicationSchedule>,
    pub day_logs: Vec<DayLog>,
    pub settings: Settings,
}
