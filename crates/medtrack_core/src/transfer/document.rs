//! Import/export document format.
//!
//! Required top-level keys: `medications` (array), `dayLogs` (array of
//! `{date, doses[]}`), `settings` (object). `version` and `exportedAt` are
//! written on export and ignored on import.

use crate::model::app_data::AppData;
use crate::model::dose::DayLog;
use crate::model::schedule::{MedicationSchedule, ScheduleValidationError};
use crate::model::settings::Settings;
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Format version written into exported documents.
pub const EXPORT_FORMAT_VERSION: u32 = 1;

/// Import validation failure carrying a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    InvalidJson(String),
    NotAnObject,
    MissingKey(&'static str),
    WrongType {
        key: &'static str,
        expected: &'static str,
    },
    InvalidEntry {
        key: &'static str,
        index: usize,
        message: String,
    },
    InvalidMedication {
        id: String,
        error: ScheduleValidationError,
    },
    DuplicateMedicationId(String),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(message) => write!(f, "import file is not valid JSON: {message}"),
            Self::NotAnObject => write!(f, "import document must be a JSON object"),
            Self::MissingKey(key) => write!(f, "import document is missing `{key}`"),
            Self::WrongType { key, expected } => {
                write!(f, "import document field `{key}` must be {expected}")
            }
            Self::InvalidEntry {
                key,
                index,
                message,
            } => write!(f, "invalid entry {index} in `{key}`: {message}"),
            Self::InvalidMedication { id, error } => {
                write!(f, "invalid medication `{id}`: {error}")
            }
            Self::DuplicateMedicationId(id) => {
                write!(f, "medication id `{id}` appears more than once")
            }
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidMedication { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    version: u32,
    exported_at: NaiveDateTime,
    medications: &'a [MedicationSchedule],
    day_logs: &'a [DayLog],
    settings: &'a Settings,
}

/// Renders `data` as a pretty-printed export document.
pub fn export_document(data: &AppData, exported_at: NaiveDateTime) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ExportDocument {
        version: EXPORT_FORMAT_VERSION,
        exported_at,
        medications: &data.medications,
        day_logs: &data.day_logs,
        settings: &data.settings,
    })
}

/// Validates and decodes an import document.
///
/// # Errors
/// - Rejects the document as a whole on the first structural or element
///   error; no partial result is ever returned.
pub fn parse_import_document(text: &str) -> Result<AppData, ImportError> {
    let root: Value =
        serde_json::from_str(text).map_err(|err| ImportError::InvalidJson(err.to_string()))?;
    let Value::Object(mut root) = root else {
        return Err(ImportError::NotAnObject);
    };

    let medications = take_array(&mut root, "medications")?;
    let day_logs = take_array(&mut root, "dayLogs")?;
    let settings = match root.remove("settings") {
        None => return Err(ImportError::MissingKey("settings")),
        Some(value @ Value::Object(_)) => value,
        Some(_) => {
            return Err(ImportError::WrongType {
                key: "settings",
                expected: "an object",
            })
        }
    };

    let medications: Vec<MedicationSchedule> = decode_entries("medications", medications)?;
    let day_logs: Vec<DayLog> = decode_entries("dayLogs", day_logs)?;
    check_day_logs(&day_logs)?;
    let settings: Settings =
        serde_json::from_value(settings).map_err(|err| ImportError::InvalidEntry {
            key: "settings",
            index: 0,
            message: err.to_string(),
        })?;

    let mut ids = HashSet::new();
    for medication in &medications {
        medication
            .validate()
            .map_err(|error| ImportError::InvalidMedication {
                id: medication.id.clone(),
                error,
            })?;
        if !ids.insert(medication.id.as_str()) {
            return Err(ImportError::DuplicateMedicationId(medication.id.clone()));
        }
    }

    Ok(AppData {
        medications,
        day_logs,
        settings,
    })
}

/// Checks record-level invariants of decoded day logs.
///
/// # Errors
/// - `InvalidEntry` for a `takenAt` that does not follow the status, or for
///   a `(date, scheduleId, time)` recorded twice, even across logs sharing a
///   date.
pub fn check_day_logs(day_logs: &[DayLog]) -> Result<(), ImportError> {
    let mut seen = HashSet::new();
    for (index, log) in day_logs.iter().enumerate() {
        for dose in &log.doses {
            if !dose.taken_at_consistent() {
                let message = if dose.taken_at.is_some() {
                    format!(
                        "dose {} at {} on {} is {} but has takenAt",
                        dose.schedule_id, dose.time, log.date, dose.status
                    )
                } else {
                    format!(
                        "dose {} at {} on {} is Taken without takenAt",
                        dose.schedule_id, dose.time, log.date
                    )
                };
                return Err(ImportError::InvalidEntry {
                    key: "dayLogs",
                    index,
                    message,
                });
            }
            if !seen.insert((log.date, dose.schedule_id.as_str(), dose.time)) {
                return Err(ImportError::InvalidEntry {
                    key: "dayLogs",
                    index,
                    message: format!(
                        "dose {} at {} on {} is recorded more than once",
                        dose.schedule_id, dose.time, log.date
                    ),
                });
            }
        }
    }
    Ok(())
}

fn take_array(root: &mut Map<String, Value>, key: &'static str) -> Result<Vec<Value>, ImportError> {
    match root.remove(key) {
        None => Err(ImportError::MissingKey(key)),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ImportError::WrongType {
            key,
            expected: "an array",
        }),
    }
}

fn decode_entries<T: serde::de::DeserializeOwned>(
    key: &'static str,
    items: Vec<Value>,
) -> Result<Vec<T>, ImportError> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|err| ImportError::InvalidEntry {
                key,
                index,
                message: err.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{export_document, parse_import_document, ImportError};
    use crate::model::app_data::AppData;
    use crate::model::schedule::MedicationSchedule;
    use chrono::NaiveDate;
    use serde_json::json;

    fn valid_document() -> serde_json::Value {
        json!({
            "medications": [{
                "id": "s1",
                "name": "Metformin",
                "strength": "500 mg",
                "timesOfDay": ["08:00", "20:00"],
                "startDate": "2026-01-01"
            }],
            "dayLogs": [{
                "date": "2026-01-01",
                "doses": [{
                    "scheduleId": "s1",
                    "time": "08:00",
                    "status": "Taken",
                    "takenAt": "2026-01-01T08:02:00"
                }]
            }],
            "settings": { "remindersEnabled": true, "leadTimeMinutes": 20 }
        })
    }

    #[test]
    fn accepts_complete_document() {
        let data = parse_import_document(&valid_document().to_string()).unwrap();
        assert_eq!(data.medications.len(), 1);
        assert_eq!(data.day_logs[0].doses.len(), 1);
        assert_eq!(data.settings.lead_time_minutes.minutes(), 20);
    }

    #[test]
    fn rejects_missing_and_mistyped_keys() {
        let mut missing = valid_document();
        missing.as_object_mut().unwrap().remove("dayLogs");
        assert_eq!(
            parse_import_document(&missing.to_string()),
            Err(ImportError::MissingKey("dayLogs"))
        );

        let mut mistyped = valid_document();
        mistyped["settings"] = json!([]);
        assert!(matches!(
            parse_import_document(&mistyped.to_string()),
            Err(ImportError::WrongType { key: "settings", .. })
        ));

        let mut medications_object = valid_document();
        medications_object["medications"] = json!({});
        assert!(matches!(
            parse_import_document(&medications_object.to_string()),
            Err(ImportError::WrongType { key: "medications", .. })
        ));
    }

    #[test]
    fn rejects_non_object_and_broken_json() {
        assert_eq!(parse_import_document("[1, 2]"), Err(ImportError::NotAnObject));
        assert!(matches!(
            parse_import_document("{\"medications\": "),
            Err(ImportError::InvalidJson(_))
        ));
    }

    #[test]
    fn rejects_bad_entries_with_index() {
        let mut bad_status = valid_document();
        bad_status["dayLogs"][0]["doses"][0]["status"] = json!("Done");
        let err = parse_import_document(&bad_status.to_string()).unwrap_err();
        assert!(matches!(err, ImportError::InvalidEntry { key: "dayLogs", index: 0, .. }));
        assert!(err.to_string().contains("dayLogs"));

        let mut duplicate = valid_document();
        let first = duplicate["medications"][0].clone();
        duplicate["medications"].as_array_mut().unwrap().push(first);
        assert_eq!(
            parse_import_document(&duplicate.to_string()),
            Err(ImportError::DuplicateMedicationId("s1".to_string()))
        );

        let mut no_times = valid_document();
        no_times["medications"][0]["timesOfDay"] = json!([]);
        assert!(matches!(
            parse_import_document(&no_times.to_string()),
            Err(ImportError::InvalidMedication { .. })
        ));
    }

    #[test]
    fn rejects_taken_at_on_open_dose() {
        let mut document = valid_document();
        document["dayLogs"][0]["doses"][0]["status"] = json!("Pending");

        let err = parse_import_document(&document.to_string()).unwrap_err();
        assert!(matches!(err, ImportError::InvalidEntry { key: "dayLogs", index: 0, .. }));
        assert!(err.to_string().contains("has takenAt"));
    }

    #[test]
    fn rejects_taken_dose_without_taken_at() {
        let mut document = valid_document();
        document["dayLogs"][0]["doses"][0]
            .as_object_mut()
            .unwrap()
            .remove("takenAt");

        let err = parse_import_document(&document.to_string()).unwrap_err();
        assert!(matches!(err, ImportError::InvalidEntry { key: "dayLogs", index: 0, .. }));
        assert!(err.to_string().contains("Taken without takenAt"));
    }

    #[test]
    fn rejects_duplicate_dose_records() {
        let mut same_log = valid_document();
        let dose = same_log["dayLogs"][0]["doses"][0].clone();
        same_log["dayLogs"][0]["doses"].as_array_mut().unwrap().push(dose);
        let err = parse_import_document(&same_log.to_string()).unwrap_err();
        assert!(matches!(err, ImportError::InvalidEntry { key: "dayLogs", index: 0, .. }));
        assert!(err.to_string().contains("more than once"));

        let mut split_logs = valid_document();
        let log = split_logs["dayLogs"][0].clone();
        split_logs["dayLogs"].as_array_mut().unwrap().push(log);
        assert!(matches!(
            parse_import_document(&split_logs.to_string()),
            Err(ImportError::InvalidEntry { key: "dayLogs", index: 1, .. })
        ));
    }

    #[test]
    fn skipped_and_pending_without_taken_at_are_accepted() {
        let mut document = valid_document();
        document["dayLogs"][0]["doses"] = json!([
            { "scheduleId": "s1", "time": "08:00", "status": "Skipped" },
            { "scheduleId": "s1", "time": "20:00", "status": "Pending" }
        ]);

        let data = parse_import_document(&document.to_string()).unwrap();
        assert_eq!(data.day_logs[0].doses.len(), 2);
    }

    #[test]
    fn export_carries_required_keys_and_reimports() {
        let mut data = AppData::default();
        data.medications.push(MedicationSchedule::with_id(
            "s1",
            "Aspirin",
            ["09:00".parse().unwrap()],
        ));
        let at = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();

        let text = export_document(&data, at).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["exportedAt"], "2026-01-01T10:00:00");
        assert!(value["dayLogs"].is_array());

        assert_eq!(parse_import_document(&text).unwrap(), data);
    }
}
