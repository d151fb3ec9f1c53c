//! # Configuration
//!
//! TOML configuration for the detector service. Every section and field has a
//! default, so an empty file (or no file at all) yields a working local setup
//! that talks to the hosted deepfake-detector Space.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::inference::retry::RetryPolicy;

/// Load a TOML configuration file and deserialize it into the specified type.
///
/// # Arguments
/// - `path`: Path to the TOML configuration file
///
/// # Returns
/// - `Ok(T)`: Successfully loaded and parsed configuration
/// - `Err`: File I/O or parsing error
///
/// # Example
/// ```ignore
/// let config: AppConfig = load_config("config/detector.toml")?;
/// ```
pub fn load_config<T>(path: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)?;
    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Complete service configuration.
///
/// # Example TOML
///
/// ```toml
/// [server]
/// address = "127.0.0.1:8000"
///
/// [inference]
/// endpoint = "https://suryakathyakeyaboddi-deepfake-detector.hf.space"
///
/// [inference.retry]
/// max_attempts = 3
/// backoff = { kind = "fixed", delay_ms = 1000 }
///
/// [storage]
/// database_path = "database.db"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub inference: InferenceConfig,
    pub storage: StorageConfig,
    pub uploads: UploadConfig,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        load_config(path)
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address to bind (e.g., "127.0.0.1:8000")
    pub address: String,
    /// Browser origins allowed by CORS. Empty means any origin.
    pub cors_origins: Vec<String>,
    /// Serve the `GET /users` listing (development helper)
    pub expose_user_listing: bool,
    /// Maximum accepted request body, in bytes
    pub max_upload_bytes: usize,
    /// Optional directory with a built frontend, served for unmatched paths
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8000".to_string(),
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            expose_user_listing: true,
            max_upload_bytes: 10 * 1024 * 1024,
            static_dir: None,
        }
    }
}

/// Remote inference endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Base URL of the Gradio app hosting the classifier
    pub endpoint: String,
    /// Named prediction entry point on the Gradio app
    pub api_name: String,
    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout_secs: Option<u64>,
    /// Upper bound on concurrent classifications. `None` means unbounded.
    pub max_in_flight: Option<usize>,
    pub retry: RetryPolicy,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://suryakathyakeyaboddi-deepfake-detector.hf.space".to_string(),
            api_name: "/predict".to_string(),
            request_timeout_secs: None,
            max_in_flight: None,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// libSQL database file, or ":memory:"
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "database.db".to_string(),
        }
    }
}

/// Upload acceptance and staging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub allowed_content_types: Vec<String>,
    /// Where uploads are staged before forwarding. Defaults to the OS temp dir.
    pub staging_dir: Option<PathBuf>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_content_types: ["image/jpeg", "image/png", "image/jpg", "image/webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            staging_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::retry::Backoff;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();

        assert_eq!(config.server.address, "127.0.0.1:8000");
        assert_eq!(config.server.cors_origins.len(), 2);
        assert_eq!(config.inference.api_name, "/predict");
        assert_eq!(config.inference.retry.max_attempts, 3);
        assert_eq!(
            config.inference.retry.backoff.delay_for(1),
            Duration::from_secs(1)
        );
        assert_eq!(config.storage.database_path, "database.db");
        assert!(config
            .uploads
            .allowed_content_types
            .contains(&"image/webp".to_string()));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
address = "0.0.0.0:9000"
cors_origins = []

[inference]
endpoint = "http://127.0.0.1:7860"
max_in_flight = 1

[inference.retry]
max_attempts = 5
retry_all_errors = true
backoff = {{ kind = "exponential", base_ms = 200, max_ms = 1000 }}
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.server.address, "0.0.0.0:9000");
        assert!(config.server.cors_origins.is_empty());
        assert_eq!(config.inference.endpoint, "http://127.0.0.1:7860");
        assert_eq!(config.inference.max_in_flight, Some(1));
        assert_eq!(config.inference.retry.max_attempts, 5);
        assert!(config.inference.retry.retry_all_errors);
        assert_eq!(
            config.inference.retry.backoff,
            Backoff::Exponential {
                base_ms: 200,
                max_ms: 1000
            }
        );
        // Untouched sections keep their defaults
        assert_eq!(config.storage.database_path, "database.db");
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/detector.toml");
        let config = AppConfig::from_file(path).unwrap();
        let defaults = AppConfig::default();

        assert_eq!(config.server.address, defaults.server.address);
        assert_eq!(config.server.cors_origins, defaults.server.cors_origins);
        assert_eq!(config.inference.endpoint, defaults.inference.endpoint);
        assert_eq!(config.inference.retry, defaults.inference.retry);
        assert_eq!(
            config.uploads.allowed_content_types,
            defaults.uploads.allowed_content_types
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(AppConfig::from_file("does/not/exist.toml").is_err());
    }
}
