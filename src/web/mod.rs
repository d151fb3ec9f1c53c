//! # HTTP API
//!
//! axum router for the detector service.
//!
//! ## Routes
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | GET | `/` | liveness message |
//! | POST | `/auth/register` | create an account |
//! | POST | `/auth/login` | check a password |
//! | GET | `/users` | account listing (only with `expose_user_listing`) |
//! | GET | `/logs/:id` | one stored detection log |
//! | POST | `/detect` | classify an uploaded image |
//!
//! The same routes are also mounted under `/api`, the prefix the hosted
//! frontend calls.

pub mod error;
pub mod handlers;
pub mod staging;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;

use crate::auth::AuthService;
use crate::common::config::{AppConfig, ServerSettings};
use crate::inference::{Classifier, Predictor};
use crate::store::RecordStore;
use staging::UploadPolicy;

/// Everything a request handler needs, built once at startup.
pub struct AppState<P> {
    pub classifier: Classifier<P>,
    pub store: Arc<RecordStore>,
    pub auth: AuthService,
    pub uploads: UploadPolicy,
    pub settings: ServerSettings,
}

impl<P: Predictor> AppState<P> {
    pub fn new(classifier: Classifier<P>, store: Arc<RecordStore>, config: &AppConfig) -> Self {
        Self {
            classifier,
            auth: AuthService::new(Arc::clone(&store)),
            store,
            uploads: UploadPolicy::from_config(&config.uploads),
            settings: config.server.clone(),
        }
    }
}

/// Builds the complete application router.
///
/// # Errors
///
/// Returns an error if a configured CORS origin is not a valid header value.
pub fn router<P: Predictor>(state: Arc<AppState<P>>) -> Result<Router> {
    let mut api = Router::new()
        .route("/", get(handlers::root))
        .route("/auth/register", post(handlers::register::<P>))
        .route("/auth/login", post(handlers::login::<P>))
        .route("/logs/:id", get(handlers::get_log::<P>))
        .route("/detect", post(handlers::detect::<P>));
    if state.settings.expose_user_listing {
        api = api.route("/users", get(handlers::list_users::<P>));
    }

    let mut app = api.clone().nest("/api", api);
    if let Some(dir) = &state.settings.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    Ok(app
        .layer(DefaultBodyLimit::max(state.settings.max_upload_bytes))
        .layer(cors_layer(&state.settings.cors_origins)?)
        .with_state(state))
}

/// CORS policy for the configured browser origins.
///
/// Credentials are allowed, and methods and headers are mirrored from the
/// preflight request. An empty origin list yields a permissive policy
/// without credentials.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    if origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }

    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin '{o}'")))
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}
