//! # Common Components
//!
//! Shared utilities and data structures used across the service.
//!
//! ## Modules
//!
//! - [`messages`]: JSON request and response bodies of the HTTP API
//! - [`config`]: Configuration parsing utilities

pub mod config;
pub mod messages;
