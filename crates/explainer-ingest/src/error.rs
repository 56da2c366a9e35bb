use explainer_core::models::IngestErrorKind;
use explainer_core::AppError;
use explainer_storage::StorageError;
use thiserror::Error;

/// Ingestion pipeline errors
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid origin: {0}")]
    InvalidOrigin(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

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

    #[error("Ingestion already in progress for repository {0}")]
    Conflict(String),

    #[error("Ingestion cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type IngestResult<T> = Result<T, IngestError>;

impl IngestError {
    /// Taxonomy kind recorded on a failed repository.
    pub fn kind(&self) -> IngestErrorKind {
        match self {
            IngestError::InvalidOrigin(_) | IngestError::InvalidInput(_) => {
                IngestErrorKind::InvalidOrigin
            }
            IngestError::UnreachableRemote(_) => IngestErrorKind::UnreachableRemote,
            IngestError::CorruptArchive(_) => IngestErrorKind::CorruptArchive,
            IngestError::QuotaExceeded(_) => IngestErrorKind::QuotaExceeded,
            IngestError::PathRejected(_) => IngestErrorKind::PathRejected,
            IngestError::NotFound(_) => IngestErrorKind::NotFound,
            IngestError::Conflict(_) => IngestErrorKind::Conflict,
            IngestError::Storage(StorageError::NotFound(_)) => IngestErrorKind::NotFound,
            IngestError::Storage(StorageError::PathRejected(_)) => IngestErrorKind::PathRejected,
            IngestError::Cancelled
            | IngestError::Io(_)
            | IngestError::Storage(_)
            | IngestError::Internal(_) => IngestErrorKind::Internal,
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::InvalidOrigin(msg) => AppError::InvalidOrigin(msg),
            IngestError::InvalidInput(msg) => AppError::InvalidInput(msg),
            IngestError::UnreachableRemote(msg) => AppError::UnreachableRemote(msg),
            IngestError::CorruptArchive(msg) => AppError::CorruptArchive(msg),
            IngestError::QuotaExceeded(msg) => AppError::QuotaExceeded(msg),
            IngestError::PathRejected(msg) => AppError::PathRejected(msg),
            IngestError::NotFound(msg) => AppError::NotFound(msg),
            IngestError::Conflict(id) => AppError::Conflict(format!(
                "Ingestion already in progress for repository {}",
                id
            )),
            IngestError::Cancelled => AppError::Internal("ingestion cancelled".to_string()),
            IngestError::Io(e) => AppError::Internal(format!("IO error: {}", e)),
            IngestError::Storage(e) => e.into(),
            IngestError::Internal(msg) => AppError::Internal(msg),
        }
    }
}
