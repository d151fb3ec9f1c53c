//! Persisted entities.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One successful classification. Written once, never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionLog {
    pub id: i64,
    /// Filename as supplied by the uploader
    pub filename: String,
    pub timestamp: DateTime<Utc>,
    /// e.g. "Real" or "Fake", when the payload carried one
    pub result_label: Option<String>,
    pub confidence_score: Option<f64>,
    /// Full remote payload, serialized as JSON text
    pub raw_response: String,
}

/// Fields supplied by the caller when logging a detection.
#[derive(Debug, Clone)]
pub struct NewDetectionLog {
    pub filename: String,
    pub result_label: Option<String>,
    pub confidence_score: Option<f64>,
    pub raw_response: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}
