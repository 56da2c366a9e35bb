//! Explainer Core Library
//!
//! This crate provides core domain models, error types, configuration, and validation
//! that are shared across all Explainer components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, ExplainerConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
// Note: SnapshotStore and StorageError live in explainer-storage
