use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use survey_core::error::StoreError;
use survey_core::recorder::{ImpressionRecorder, ResultRecorder};
use tracing::{debug, info};

/// Append-only SQLite store holding the two persisted tables.
pub struct SurveyStore {
    conn: Mutex<Connection>,
}

impl SurveyStore {
    /// Open or create the database at `path` and ensure the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(connection_err)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        info!("Survey store opened and schema verified");
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(connection_err)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Create the append-only tables if they do not exist. Idempotent.
    fn ensure_schema(&self) -> Result<(), StoreError> {
        self.conn
            .lock()
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS survey_results (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    survey_name TEXT NOT NULL,
                    survey_language TEXT NOT NULL,
                    survey_data TEXT NOT NULL,
                    submitted_at TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS survey_impressions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    survey_name TEXT NOT NULL,
                    survey_language TEXT NOT NULL,
                    impression_time TEXT NOT NULL
                );",
            )
            .map_err(backend_err)
    }

    /// Number of impressions recorded for a survey (test/ops helper).
    pub fn impression_count(&self, survey_name: &str) -> Result<i64, StoreError> {
        self.conn
            .lock()
            .query_row(
                "SELECT COUNT(*) FROM survey_impressions WHERE survey_name = ?1",
                params![survey_name],
                |row| row.get(0),
            )
            .map_err(backend_err)
    }
}

impl ImpressionRecorder for SurveyStore {
    fn record_impression(&self, survey_name: &str, language: &str) -> Result<(), StoreError> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO survey_impressions (survey_name, survey_language, impression_time)
                 VALUES (?1, ?2, ?3)",
                params![survey_name, language, Utc::now().to_rfc3339()],
            )
            .map_err(backend_err)?;
        debug!(survey = %survey_name, language = %language, "Logged impression");
        Ok(())
    }
}

impl ResultRecorder for SurveyStore {
    fn save_result(
        &self,
        survey_name: &str,
        language: &str,
        payload: &serde_json::Value,
    ) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO survey_results (survey_name, survey_language, survey_data, submitted_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                survey_name,
                language,
                payload.to_string(),
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(backend_err)?;
        Ok(conn.last_insert_rowid())
    }
}

fn backend_err(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn connection_err(e: rusqlite::Error) -> StoreError {
    StoreError::Connection(e.to_string())
}
