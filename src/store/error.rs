//! Record store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A SQL query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Creating the schema failed.
    #[error("Schema setup failed: {0}")]
    Schema(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// A user with this email already exists.
    #[error("Email already registered")]
    EmailTaken,

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),
}
