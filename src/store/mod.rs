//! # Record Store
//!
//! libSQL-backed persistence for detection logs and user credentials.
//!
//! The schema is created on open with `CREATE TABLE IF NOT EXISTS`, so opening
//! an existing database file is idempotent. Timestamps are stored as RFC 3339
//! text.
//!
//! One connection is shared by all request handlers. Inserts read their new row
//! id through `RETURNING` rather than `last_insert_rowid()`, which would race
//! between concurrent writers on the same connection.

pub mod error;
pub mod models;

use chrono::{DateTime, Utc};
use libsql::Builder;
use log::info;

use error::StoreError;
pub use models::{DetectionLog, NewDetectionLog, User};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS detection_logs (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    filename         TEXT NOT NULL,
    timestamp        TEXT NOT NULL,
    result_label     TEXT,
    confidence_score REAL,
    raw_response     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);
";

pub struct RecordStore {
    /// Keeps the database open for as long as `conn` is in use
    _db: libsql::Database,
    conn: libsql::Connection,
}

impl RecordStore {
    /// Open (or create) the database at `path`. Pass `":memory:"` for tests.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the database cannot be opened or the schema
    /// cannot be created.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        conn.execute_batch(SCHEMA)
            .await
            .map_err(|e| StoreError::Schema(e.to_string()))?;

        info!("Record store ready at {}", path);
        Ok(Self { _db: db, conn })
    }

    pub async fn insert_detection_log(
        &self,
        entry: NewDetectionLog,
    ) -> Result<DetectionLog, StoreError> {
        let timestamp = Utc::now();
        let mut rows = self
            .conn
            .query(
                "INSERT INTO detection_logs (filename, timestamp, result_label, confidence_score, raw_response)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING id",
                libsql::params![
                    entry.filename.as_str(),
                    timestamp.to_rfc3339(),
                    entry.result_label.as_deref(),
                    entry.confidence_score,
                    entry.raw_response.as_str()
                ],
            )
            .await?;
        let row = rows.next().await?.ok_or(StoreError::NoResult)?;

        Ok(DetectionLog {
            id: row.get::<i64>(0)?,
            filename: entry.filename,
            timestamp,
            result_label: entry.result_label,
            confidence_score: entry.confidence_score,
            raw_response: entry.raw_response,
        })
    }

    pub async fn get_detection_log(&self, id: i64) -> Result<DetectionLog, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, filename, timestamp, result_label, confidence_score, raw_response
                 FROM detection_logs WHERE id = ?1",
                [id],
            )
            .await?;
        let row = rows.next().await?.ok_or(StoreError::NoResult)?;

        Ok(DetectionLog {
            id: row.get::<i64>(0)?,
            filename: row.get::<String>(1)?,
            timestamp: parse_datetime(&row.get::<String>(2)?)?,
            result_label: row.get::<Option<String>>(3)?,
            confidence_score: row.get::<Option<f64>>(4)?,
            raw_response: row.get::<String>(5)?,
        })
    }

    /// Insert a user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::EmailTaken` if the email is already registered.
    pub async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let created_at = Utc::now();
        let mut rows = self
            .conn
            .query(
                "INSERT INTO users (email, password_hash, created_at)
                 VALUES (?1, ?2, ?3)
                 RETURNING id",
                libsql::params![email, password_hash, created_at.to_rfc3339()],
            )
            .await
            .map_err(map_unique_violation)?;
        let row = rows
            .next()
            .await
            .map_err(map_unique_violation)?
            .ok_or(StoreError::NoResult)?;

        Ok(User {
            id: row.get::<i64>(0)?,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at,
        })
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, email, password_hash, created_at FROM users WHERE email = ?1",
                [email],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, email, password_hash, created_at FROM users ORDER BY id",
                (),
            )
            .await?;
        let mut users = Vec::new();
        while let Some(row) = rows.next().await? {
            users.push(row_to_user(&row)?);
        }
        Ok(users)
    }
}

fn row_to_user(row: &libsql::Row) -> Result<User, StoreError> {
    Ok(User {
        id: row.get::<i64>(0)?,
        email: row.get::<String>(1)?,
        password_hash: row.get::<String>(2)?,
        created_at: parse_datetime(&row.get::<String>(3)?)?,
    })
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Query(format!("Failed to parse datetime '{s}': {e}")))
}

fn map_unique_violation(e: libsql::Error) -> StoreError {
    if e.to_string().contains("UNIQUE constraint failed") {
        StoreError::EmailTaken
    } else {
        StoreError::LibSql(e)
    }
}
