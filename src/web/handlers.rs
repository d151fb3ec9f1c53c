//! Request handlers.

use axum::body::Bytes;
use axum::extract::{multipart::Multipart, Path, State};
use axum::Json;
use log::{error, info, warn};
use std::sync::Arc;
use uuid::Uuid;

use super::error::ApiError;
use super::AppState;
use crate::common::messages::{
    Credentials, DetectResponse, LoginResponse, RegisterResponse, StatusMessage, UserSummary,
};
use crate::inference::{Predictor, Verdict};
use crate::store::error::StoreError;
use crate::store::{DetectionLog, NewDetectionLog};

/// Name of the multipart field carrying the image.
const UPLOAD_FIELD: &str = "file";

pub async fn root() -> Json<StatusMessage> {
    Json(StatusMessage {
        message: "Deepfake Detector API is running".to_string(),
    })
}

pub async fn register<P: Predictor>(
    State(state): State<Arc<AppState<P>>>,
    Json(body): Json<Credentials>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let user = state.auth.register(&body.email, &body.password).await?;
    Ok(Json(RegisterResponse {
        message: "User created successfully".to_string(),
        user_id: user.id,
    }))
}

pub async fn login<P: Predictor>(
    State(state): State<Arc<AppState<P>>>,
    Json(body): Json<Credentials>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state.auth.login(&body.email, &body.password).await?;
    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        user_id: user.id,
        email: user.email,
    }))
}

/// Development helper listing registered accounts.
pub async fn list_users<P: Predictor>(
    State(state): State<Arc<AppState<P>>>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let users = state.store.list_users().await?;
    Ok(Json(users.into_iter().map(UserSummary::from).collect()))
}

pub async fn get_log<P: Predictor>(
    State(state): State<Arc<AppState<P>>>,
    Path(id): Path<i64>,
) -> Result<Json<DetectionLog>, ApiError> {
    match state.store.get_detection_log(id).await {
        Ok(log) => Ok(Json(log)),
        Err(StoreError::NoResult) => Err(ApiError::NotFound(format!(
            "Detection log {id} not found"
        ))),
        Err(e) => Err(e.into()),
    }
}

struct Upload {
    filename: String,
    content_type: Option<String>,
    data: Bytes,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart data: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read image data: {e}")))?;
        return Ok(Upload {
            filename,
            content_type,
            data,
        });
    }
    Err(ApiError::BadRequest("No file provided".to_string()))
}

/// Stages the uploaded image, classifies it, and logs the result.
pub async fn detect<P: Predictor>(
    State(state): State<Arc<AppState<P>>>,
    mut multipart: Multipart,
) -> Result<Json<DetectResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let upload = read_upload(&mut multipart).await?;
    let content_type = state
        .uploads
        .check_content_type(upload.content_type.as_deref(), &upload.data)?;

    info!(
        "📥 [{}] Received {} ({}, {} bytes)",
        request_id,
        upload.filename,
        content_type,
        upload.data.len()
    );

    let staged = state
        .uploads
        .stage(&upload.filename, upload.data)
        .await
        .map_err(|e| {
            error!("❌ [{}] Failed to stage upload: {}", request_id, e);
            ApiError::Internal(format!("Failed to stage upload: {e}"))
        })?;

    let outcome = state.classifier.classify(staged.path()).await;
    staged.remove();

    let prediction = outcome.map_err(|e| {
        error!("❌ [{}] Error processing request: {}", request_id, e);
        ApiError::Internal(e.to_string())
    })?;

    let verdict = Verdict::from_payload(&prediction);
    let log_entry = state
        .store
        .insert_detection_log(NewDetectionLog {
            filename: upload.filename.clone(),
            result_label: verdict.label.clone(),
            confidence_score: verdict.confidence,
            raw_response: prediction.to_string(),
        })
        .await?;

    info!(
        "✅ [{}] {} classified as {} (log #{})",
        request_id,
        upload.filename,
        verdict.label.as_deref().unwrap_or("unknown"),
        log_entry.id
    );
    if verdict.is_fake() {
        warn!("⚠️  [{}] {} is a potential deepfake", request_id, upload.filename);
    }

    Ok(Json(DetectResponse {
        status: "success".to_string(),
        filename: upload.filename,
        prediction,
        log_id: log_entry.id,
        result_label: verdict.label,
        confidence_score: verdict.confidence,
    }))
}
