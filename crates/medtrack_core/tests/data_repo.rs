use medtrack_core::db::open_db_in_memory;
use medtrack_core::{
    AppData, DataRepository, DayLog, DoseRecord, DoseStatus, LeadTime, MedicationSchedule,
    SqliteDataRepository,
};
use chrono::NaiveDate;

fn sample_data() -> AppData {
    let time = "08:00".parse().unwrap();
    let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    let mut log = DayLog::new(date);
    let mut record = DoseRecord::pending("s1", time);
    record.set_status(DoseStatus::Taken, date.and_hms_opt(8, 3, 0).unwrap());
    log.doses.push(record);

    let mut data = AppData::default();
    data.medications
        .push(MedicationSchedule::with_id("s1", "Metformin", [time]));
    data.day_logs.push(log);
    data.settings.reminders_enabled = true;
    data.settings.lead_time_minutes = LeadTime::ThirtyMinutes;
    data
}

#[test]
fn empty_store_loads_default_document() {
    let repo = SqliteDataRepository::new(open_db_in_memory().unwrap());
    assert_eq!(repo.load_all_data(), AppData::default());
}

#[test]
fn save_then_load_returns_same_document() {
    let repo = SqliteDataRepository::new(open_db_in_memory().unwrap());
    let data = sample_data();

    repo.save_all_data(&data).unwrap();
    repo.save_all_data(&data).unwrap();

    assert_eq!(repo.load_all_data(), data);
    let rows: i64 = repo
        .connection()
        .query_row("SELECT COUNT(*) FROM kv_store;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn malformed_stored_document_falls_back_to_default() {
    let repo = SqliteDataRepository::new(open_db_in_memory().unwrap());
    repo.connection()
        .execute(
            "INSERT INTO kv_store (key, value) VALUES ('medtrack_data', '{\"medications\": 7');",
            [],
        )
        .unwrap();

    assert_eq!(repo.load_all_data(), AppData::default());
}

#[test]
fn data_survives_reopening_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("medtrack.sqlite3");

    SqliteDataRepository::open(&path)
        .unwrap()
        .save_all_data(&sample_data())
        .unwrap();

    let reopened = SqliteDataRepository::open(&path).unwrap();
    assert_eq!(reopened.load_all_data(), sample_data());
}
