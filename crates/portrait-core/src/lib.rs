//! Portrait Core Library
//!
//! This crate provides the domain models, error types, configuration and
//! pipeline constants shared by the crop transform, the upload client and the
//! CLI host.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::ClientConfig;
pub use error::{AppError, ErrorMetadata, LogLevel, ValidationError};
