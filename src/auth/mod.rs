//! # Accounts
//!
//! Email/password registration and login against the record store. A
//! successful login only confirms the password; no session or token is issued.
//!
//! Argon2 is deliberately slow, so hashing and verification run on Tokio's
//! blocking pool instead of a request worker.

pub mod password;

use log::{info, warn};
use std::sync::Arc;
use thiserror::Error;

use crate::store::error::StoreError;
use crate::store::{RecordStore, User};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Email already registered")]
    EmailTaken,

    /// Unknown email and wrong password are reported identically.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct AuthService {
    store: Arc<RecordStore>,
}

impl AuthService {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput(
                "Email and password are required".to_string(),
            ));
        }
        if self.store.find_user_by_email(email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let plain = password.to_string();
        let hash = tokio::task::spawn_blocking(move || password::hash_password(&plain))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .map_err(|e| AuthError::Hashing(e.to_string()))?;

        let user = self.store.create_user(email, &hash).await.map_err(|e| match e {
            StoreError::EmailTaken => AuthError::EmailTaken,
            other => AuthError::Store(other),
        })?;

        info!("👤 Registered user {} ({})", user.id, user.email);
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let Some(user) = self.store.find_user_by_email(email).await? else {
            warn!("Login attempt for unknown email {}", email);
            return Err(AuthError::InvalidCredentials);
        };

        let candidate = password.to_string();
        let stored = user.password_hash.clone();
        let matches =
            tokio::task::spawn_blocking(move || password::verify_password(&candidate, &stored))
                .await
                .map_err(|e| AuthError::Hashing(e.to_string()))?;

        if !matches {
            warn!("Wrong password for user {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        info!("🔑 User {} logged in", user.id);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> AuthService {
        AuthService::new(Arc::new(RecordStore::open(":memory:").await.unwrap()))
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let auth = service().await;

        let registered = auth.register("ada@example.com", "s3cret").await.unwrap();
        let logged_in = auth.login("ada@example.com", "s3cret").await.unwrap();

        assert_eq!(registered.id, logged_in.id);
        assert_ne!(logged_in.password_hash, "s3cret");
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let auth = service().await;
        auth.register("ada@example.com", "one").await.unwrap();

        let err = auth.register("ada@example.com", "two").await.unwrap_err();

        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_the_same() {
        let auth = service().await;
        auth.register("ada@example.com", "right").await.unwrap();

        let wrong = auth.login("ada@example.com", "wrong").await.unwrap_err();
        let unknown = auth.login("bob@example.com", "right").await.unwrap_err();

        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_blank_fields_are_rejected() {
        let auth = service().await;
        assert!(matches!(
            auth.register("  ", "pw").await,
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            auth.register("ada@example.com", "").await,
            Err(AuthError::InvalidInput(_))
        ));
    }
}
