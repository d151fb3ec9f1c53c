//! Upload acceptance and staging.
//!
//! Uploads are written to a named temporary file so the predictor can read
//! them from disk. The file keeps the upload's extension and is deleted when
//! the [`StagedUpload`] is dropped, whatever path the request took.

use axum::body::Bytes;
use image::ImageFormat;
use log::warn;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::error::ApiError;
use crate::common::config::UploadConfig;

const DEFAULT_SUFFIX: &str = ".jpg";

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    allowed_content_types: Vec<String>,
    staging_dir: PathBuf,
}

impl UploadPolicy {
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            allowed_content_types: config.allowed_content_types.clone(),
            staging_dir: config
                .staging_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
        }
    }

    /// Resolves the upload's content type and checks it against the allow list.
    ///
    /// When the client sent no content type (or a generic binary one) the type
    /// is sniffed from the file's magic bytes.
    pub fn check_content_type(&self, declared: Option<&str>, data: &[u8]) -> Result<String, ApiError> {
        let content_type = match declared {
            Some(ct) if ct != "application/octet-stream" => ct.to_string(),
            other => sniff_content_type(data)
                .map(str::to_string)
                .unwrap_or_else(|| other.unwrap_or("unknown").to_string()),
        };

        if self.allowed_content_types.contains(&content_type) {
            Ok(content_type)
        } else {
            Err(ApiError::BadRequest(format!(
                "Unsupported file type: {content_type}"
            )))
        }
    }

    /// Writes `data` to a fresh temp file in the staging directory.
    pub async fn stage(&self, filename: &str, data: Bytes) -> std::io::Result<StagedUpload> {
        let suffix = suffix_for(filename);
        let dir = self.staging_dir.clone();

        tokio::task::spawn_blocking(move || -> std::io::Result<StagedUpload> {
            let mut file = tempfile::Builder::new()
                .prefix("upload-")
                .suffix(&suffix)
                .tempfile_in(&dir)?;
            file.write_all(&data)?;
            file.flush()?;
            Ok(StagedUpload { file })
        })
        .await
        .map_err(std::io::Error::other)?
    }
}

/// A staged upload on disk. Removed on drop.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Deletes the file now, logging rather than failing if that goes wrong.
    pub fn remove(self) {
        let path = self.file.path().to_path_buf();
        if let Err(e) = self.file.close() {
            warn!("Failed to remove staged upload {}: {}", path.display(), e);
        }
    }
}

fn suffix_for(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| DEFAULT_SUFFIX.to_string())
}

fn sniff_content_type(data: &[u8]) -> Option<&'static str> {
    let mime = match image::guess_format(data).ok()? {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Gif => "image/gif",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        _ => return None,
    };
    Some(mime)
}
