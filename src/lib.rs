pub mod auth;
pub mod common;
pub mod inference;
pub mod store;
pub mod web;

pub use common::config::AppConfig;
pub use inference::{Classifier, GradioClient, InferenceError, Predictor};
pub use store::RecordStore;
