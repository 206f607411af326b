//! Whole-document data repository.

use crate::db::{open_db, DbError};
use crate::model::app_data::AppData;
use crate::transfer::document::check_day_logs;
use log::{debug, error, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Key under which the tracker document is stored.
pub const DATA_KEY: &str = "medtrack_data";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for save paths.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Encode(serde_json::Error),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode tracker data: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// Persistence provider for the tracker document.
pub trait DataRepository {
    /// Loads the stored document, falling back to defaults.
    fn load_all_data(&self) -> AppData;
    fn save_all_data(&self, data: &AppData) -> RepoResult<()>;
}

/// Decodes a stored document, substituting defaults for unreadable data.
///
/// Dose records breaking the `takenAt` rule or recorded twice make the
/// document unreadable as well.
pub fn decode_or_default(raw: Option<&str>) -> AppData {
    let Some(raw) = raw else {
        debug!("event=data_load module=repo status=empty");
        return AppData::default();
    };

    let decoded = serde_json::from_str::<AppData>(raw)
        .map_err(|err| err.to_string())
        .and_then(|data| {
            check_day_logs(&data.day_logs)
                .map(|()| data)
                .map_err(|err| err.to_string())
        });

    match decoded {
        Ok(data) => {
            debug!(
                "event=data_load module=repo status=ok medications={} day_logs={}",
                data.medications.len(),
                data.day_logs.len()
            );
            data
        }
        Err(err) => {
            warn!(
                "event=data_load module=repo status=recovered error_code=malformed_data error={}",
                err
            );
            AppData::default()
        }
    }
}

/// SQLite-backed repository storing the document in `kv_store`.
#[derive(Debug)]
pub struct SqliteDataRepository {
    conn: Connection,
}

impl SqliteDataRepository {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens the data file at `path`, applying migrations.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn read_raw(&self) -> RepoResult<Option<String>> {
        let raw = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1;",
                params![DATA_KEY],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(raw)
    }
}

impl DataRepository for SqliteDataRepository {
    fn load_all_data(&self) -> AppData {
        match self.read_raw() {
            Ok(raw) => decode_or_default(raw.as_deref()),
            Err(err) => {
                error!(
                    "event=data_load module=repo status=recovered error_code=read_failed error={}",
                    err
                );
                AppData::default()
            }
        }
    }

    fn save_all_data(&self, data: &AppData) -> RepoResult<()> {
        let encoded = serde_json::to_string(data)?;
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, strftime('%s', 'now') * 1000)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![DATA_KEY, encoded],
        )?;
        debug!(
            "event=data_save module=repo status=ok bytes={}",
            encoded.len()
        );
        Ok(())
    }
}

/// In-memory repository keeping the encoded document.
#[derive(Debug, Default)]
pub struct MemoryDataRepository {
    raw: Mutex<Option<String>>,
}

impl MemoryDataRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the repository with raw stored text, valid or not.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }

    /// Currently stored raw text.
    pub fn raw(&self) -> Option<String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.raw.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DataRepository for MemoryDataRepository {
    fn load_all_data(&self) -> AppData {
        decode_or_default(self.lock().as_deref())
    }

    fn save_all_data(&self, data: &AppData) -> RepoResult<()> {
        *self.lock() = Some(serde_json::to_string(data)?);
        Ok(())
    }
}

impl<R: DataRepository + ?Sized> DataRepository for &R {
    fn load_all_data(&self) -> AppData {
        (**self).load_all_data()
    }

    fn save_all_data(&self, data: &AppData) -> RepoResult<()> {
        (**self).save_all_data(data)
    }
}

impl<R: DataRepository + ?Sized> DataRepository for Arc<R> {
    fn load_all_data(&self) -> AppData {
        (**self).load_all_data()
    }

    fn save_all_data(&self, data: &AppData) -> RepoResult<()> {
        (**self).save_all_data(data)
    }
}
