//! Error types module
//!
//! This module provides the core error types used throughout the Explainer application.
//! All errors are unified under the `AppError` enum: the ingestion taxonomy
//! (invalid origin, unreachable remote, corrupt archive, quota, path rejection,
//! not found, conflict) plus the generic request and upstream failures.

use std::io;

use crate::models::IngestErrorKind;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like resource limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "PATH_REJECTED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid origin: {0}")]
    InvalidOrigin(String),

    #[error("Remote unreachable: {0}")]
    UnreachableRemote(String),

    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Path rejected: {0}")]
    PathRejected(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::InvalidOrigin(_) => (
            422,
            "INVALID_ORIGIN",
            false,
            Some("Provide an http(s), ssh or git repository URL from an allowed host"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnreachableRemote(_) => (
            502,
            "UNREACHABLE_REMOTE",
            true,
            Some("Check that the repository exists and is public, then retry"),
            false,
            LogLevel::Warn,
        ),
        AppError::CorruptArchive(_) => (
            422,
            "CORRUPT_ARCHIVE",
            false,
            Some("Re-create the archive as zip, tar or tar.gz and upload again"),
            false,
            LogLevel::Debug,
        ),
        AppError::QuotaExceeded(_) => (
            413,
            "QUOTA_EXCEEDED",
            false,
            Some("Reduce repository size or number of files"),
            false,
            LogLevel::Warn,
        ),
        AppError::PathRejected(_) => (
            400,
            "PATH_REJECTED",
            false,
            Some("Use a relative path inside the repository without '..' segments"),
            false,
            LogLevel::Warn,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Conflict(_) => (
            409,
            "CONFLICT",
            true,
            Some("Wait for the running ingestion to finish and retry"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size"),
            false,
            LogLevel::Debug,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Upstream(_) => (
            502,
            "UPSTREAM_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Warn,
        ),
        AppError::ServiceUnavailable(_) => (
            503,
            "SERVICE_UNAVAILABLE",
            false,
            Some("Contact the operator to enable this feature"),
            false,
            LogLevel::Warn,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidOrigin(_) => "InvalidOrigin",
            AppError::UnreachableRemote(_) => "UnreachableRemote",
            AppError::CorruptArchive(_) => "CorruptArchive",
            AppError::QuotaExceeded(_) => "QuotaExceeded",
            AppError::PathRejected(_) => "PathRejected",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Storage(_) => "Storage",
            AppError::Upstream(_) => "Upstream",
            AppError::ServiceUnavailable(_) => "ServiceUnavailable",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Build the error matching a recorded ingestion failure kind.
    pub fn from_ingest_kind(kind: IngestErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            IngestErrorKind::InvalidOrigin => AppError::InvalidOrigin(message),
            IngestErrorKind::UnreachableRemote => AppError::UnreachableRemote(message),
            IngestErrorKind::CorruptArchive => AppError::CorruptArchive(message),
            IngestErrorKind::QuotaExceeded => AppError::QuotaExceeded(message),
            IngestErrorKind::PathRejected => AppError::PathRejected(message),
            IngestErrorKind::NotFound => AppError::NotFound(message),
            IngestErrorKind::Conflict => AppError::Conflict(message),
            IngestErrorKind::Internal => AppError::Internal(message),
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidOrigin(ref msg) => msg.clone(),
            AppError::UnreachableRemote(ref msg) => msg.clone(),
            AppError::CorruptArchive(ref msg) => msg.clone(),
            AppError::QuotaExceeded(ref msg) => msg.clone(),
            AppError::PathRejected(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Conflict(ref msg) => msg.clone(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Upstream(_) => "Upstream service request failed".to_string(),
            AppError::ServiceUnavailable(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}
