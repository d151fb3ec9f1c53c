//! # API Messages
//!
//! JSON bodies exchanged over the HTTP API:
//! - Account registration and login
//! - Detection results
//! - Error replies
//!
//! Field names follow the API the browser frontend already speaks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::User;

// ============================================================================
// ACCOUNTS
// ============================================================================

/// Body of `POST /auth/register` and `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// **Register Response**
///
/// # Fields
/// - `message`: Always "User created successfully"
/// - `user_id`: ID of the new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: i64,
}

/// **Login Response**
///
/// Confirms the password matched. No token is issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub user_id: i64,
    pub email: String,
}

/// One entry of the `GET /users` listing. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

// ============================================================================
// DETECTION
// ============================================================================

/// **Detect Response**
///
/// # Fields
/// - `status`: Always "success"
/// - `filename`: Filename as uploaded
/// - `prediction`: Remote payload, unchanged
/// - `log_id`: ID of the stored detection log
/// - `result_label` / `confidence_score`: Verdict extracted from the payload, if any
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResponse {
    pub status: String,
    pub filename: String,
    pub prediction: Value,
    pub log_id: i64,
    pub result_label: Option<String>,
    pub confidence_score: Option<f64>,
}

// ============================================================================
// STATUS & ERRORS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message: String,
}

/// Error body: `{"detail": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
