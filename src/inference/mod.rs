//! # Inference
//!
//! Everything needed to turn a staged image into a classification result.
//!
//! ## Modules
//!
//! - [`classifier`]: The retrying [`Classifier`] the request handlers call
//! - [`gradio`]: [`GradioClient`], the production [`Predictor`] speaking the Gradio HTTP API
//! - [`retry`]: Attempt ceiling, retryable-error filter and backoff strategy
//! - [`verdict`]: Best-effort label/confidence extraction from the opaque payload
//! - [`error`]: [`InferenceError`] and its transient/permanent classification
//!
//! ## Seam
//!
//! The remote call sits behind the [`Predictor`] trait. The binary composes a
//! `Classifier<GradioClient>`; tests substitute a scripted fake.

pub mod classifier;
pub mod error;
pub mod gradio;
pub mod retry;
pub mod verdict;

use serde_json::Value;
use std::future::Future;
use std::path::Path;

pub use classifier::Classifier;
pub use error::InferenceError;
pub use gradio::GradioClient;
pub use retry::{Backoff, RetryPolicy};
pub use verdict::Verdict;

/// A single, non-retrying prediction against the remote endpoint.
///
/// Implementations must be safe to call from many tasks at once; the
/// classifier shares one instance across all in-flight requests.
pub trait Predictor: Send + Sync + 'static {
    /// Submit the file at `path` and return the raw result payload.
    fn predict(&self, path: &Path) -> impl Future<Output = Result<Value, InferenceError>> + Send;
}
