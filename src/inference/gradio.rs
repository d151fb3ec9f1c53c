//! # Gradio Client
//!
//! HTTP client for a Gradio app exposing an image classifier, such as a
//! Hugging Face Space.
//!
//! ## Prediction Workflow
//!
//! 1. **Upload**: `POST {base}{prefix}/upload` with the image as multipart field `files`
//! 2. **Queue**: `POST {base}{prefix}/call{api_name}` referencing the uploaded file;
//!    the app answers with an `event_id`
//! 3. **Result**: `GET {base}{prefix}/call{api_name}/{event_id}` streams
//!    server-sent events until `complete` (outputs) or `error`
//!
//! `prefix` comes from the app's `/config` document (`api_prefix`, "/gradio_api"
//! on Gradio 5, absent on older releases). The document is fetched on the first
//! prediction and cached for the life of the client. A failed handshake is not
//! cached, so a sleeping Space only fails the requests made while it is down.

use log::{debug, info};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::error::InferenceError;
use super::Predictor;
use crate::common::config::InferenceConfig;

/// Connection handle to a remote Gradio app.
///
/// Cheap to share: the inner `reqwest::Client` pools connections and is safe
/// to use from many tasks at once.
#[derive(Debug)]
pub struct GradioClient {
    http: reqwest::Client,
    base_url: String,
    api_name: String,
    /// Filled by the first successful `/config` handshake
    api_prefix: OnceCell<String>,
}

#[derive(Debug, Deserialize)]
struct AppConfigDocument {
    #[serde(default)]
    api_prefix: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueuedCall {
    event_id: String,
}

impl GradioClient {
    /// Builds a client for the Gradio app described by `config`.
    ///
    /// No request is made here; the app is contacted on the first prediction.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            http: builder.build()?,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            api_name: normalize_api_name(&config.api_name),
            api_prefix: OnceCell::new(),
        })
    }

    /// Returns the app's API prefix, performing the `/config` handshake if it
    /// has not succeeded yet.
    async fn api_prefix(&self) -> Result<&str, InferenceError> {
        let prefix = self
            .api_prefix
            .get_or_try_init(|| self.handshake())
            .await?;
        Ok(prefix.as_str())
    }

    async fn handshake(&self) -> Result<String, InferenceError> {
        info!("Initializing Gradio client for {}...", self.base_url);

        let resp = check_response(self.http.get(format!("{}/config", self.base_url)).send().await?)
            .await?;
        let document: AppConfigDocument = resp
            .json()
            .await
            .map_err(|e| InferenceError::Protocol(format!("invalid /config document: {e}")))?;

        let api_prefix = document
            .api_prefix
            .map(|p| p.trim_end_matches('/').to_string())
            .unwrap_or_default();

        info!(
            "Gradio client initialized (version {}, api prefix '{}')",
            document.version.as_deref().unwrap_or("unknown"),
            api_prefix
        );
        Ok(api_prefix)
    }

    fn url(&self, api_prefix: &str, path: &str) -> String {
        format!("{}{}{}", self.base_url, api_prefix, path)
    }

    /// Uploads the file and returns its server-side path.
    async fn upload(&self, api_prefix: &str, path: &Path) -> Result<(String, String), InferenceError> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let form = Form::new().part("files", Part::bytes(data).file_name(file_name.clone()));
        let resp = self
            .http
            .post(self.url(api_prefix, "/upload"))
            .multipart(form)
            .send()
            .await?;
        let uploaded: Vec<String> = check_response(resp)
            .await?
            .json()
            .await
            .map_err(|e| InferenceError::Protocol(format!("invalid upload reply: {e}")))?;

        let remote_path = uploaded
            .into_iter()
            .next()
            .ok_or_else(|| InferenceError::Protocol("upload reply lists no files".to_string()))?;
        Ok((remote_path, file_name))
    }
}

impl Predictor for GradioClient {
    async fn predict(&self, path: &Path) -> Result<Value, InferenceError> {
        let api_prefix = self.api_prefix().await?;
        let (remote_path, orig_name) = self.upload(api_prefix, path).await?;
        debug!("Uploaded {} as {}", path.display(), remote_path);

        let call_url = self.url(api_prefix, &format!("/call{}", self.api_name));
        let body = json!({
            "data": [{
                "path": remote_path,
                "orig_name": orig_name,
                "meta": {"_type": "gradio.FileData"},
            }]
        });
        let queued: QueuedCall = check_response(self.http.post(&call_url).json(&body).send().await?)
            .await?
            .json()
            .await
            .map_err(|e| InferenceError::Protocol(format!("invalid call reply: {e}")))?;
        debug!("Queued prediction as event {}", queued.event_id);

        let stream = check_response(
            self.http
                .get(format!("{call_url}/{}", queued.event_id))
                .send()
                .await?,
        )
        .await?
        .text()
        .await
        .map_err(interrupted_stream)?;

        parse_event_stream(&stream)
    }
}

/// Maps non-success responses to [`InferenceError::Remote`].
async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, InferenceError> {
    if !resp.status().is_success() {
        return Err(InferenceError::Remote {
            status: resp.status().as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

/// The result stream stays open while the job waits in the queue; losing the
/// connection part way through is a transient failure, whatever kind reqwest
/// assigns to it.
fn interrupted_stream(e: reqwest::Error) -> InferenceError {
    if e.is_timeout() {
        InferenceError::Transport(e)
    } else {
        InferenceError::Unavailable(format!("result stream interrupted: {e}"))
    }
}

fn normalize_api_name(api_name: &str) -> String {
    let trimmed = api_name.trim_matches('/');
    format!("/{trimmed}")
}

/// Extracts the outcome from a Gradio server-sent event stream.
///
/// A single output is returned bare; several outputs are returned as the array.
pub(crate) fn parse_event_stream(stream: &str) -> Result<Value, InferenceError> {
    let mut event = "";
    for line in stream.lines() {
        if let Some(name) = line.strip_prefix("event:") {
            event = name.trim();
        } else if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            match event {
                "complete" => {
                    let outputs: Value = serde_json::from_str(data).map_err(|e| {
                        InferenceError::Protocol(format!("invalid completion data: {e}"))
                    })?;
                    return Ok(match outputs {
                        Value::Array(mut items) if items.len() == 1 => items.remove(0),
                        other => other,
                    });
                }
                "error" => {
                    let detail = match serde_json::from_str::<Value>(data) {
                        Ok(Value::String(s)) => s,
                        Ok(Value::Null) => "the app reported an error without details".to_string(),
                        Err(_) if data.is_empty() => {
                            "the app reported an error without details".to_string()
                        }
                        _ => data.to_string(),
                    };
                    return Err(InferenceError::Prediction(detail));
                }
                _ => {}
            }
        }
    }
    Err(InferenceError::Protocol(
        "event stream ended without a result".to_string(),
    ))
}
