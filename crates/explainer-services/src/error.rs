use explainer_core::AppError;
use explainer_ingest::IngestError;
use explainer_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Repository {0} is not ready")]
    NotReady(String),

    /// A required provider setting (API key, endpoint) is missing.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error(transparent)]
    Rejected(#[from] AppError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => AppError::NotFound(msg),
            ServiceError::NotReady(id) => AppError::Conflict(format!(
                "Repository {} is not ready; wait for ingestion to finish",
                id
            )),
            ServiceError::NotConfigured(what) => {
                AppError::ServiceUnavailable(format!("{} is not configured", what))
            }
            ServiceError::Upstream(msg) => AppError::Upstream(msg),
            ServiceError::Rejected(e) => e,
            ServiceError::Ingest(e) => e.into(),
            ServiceError::Storage(e) => e.into(),
            ServiceError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use explainer_core::ErrorMetadata;

    #[test]
    fn test_status_codes() {
        let cases: Vec<(ServiceError, u16)> = vec![
            (ServiceError::NotFound("q".into()), 404),
            (ServiceError::NotReady("r".into()), 409),
            (ServiceError::NotConfigured("GEMINI_API_KEY"), 503),
            (ServiceError::Upstream("boom".into()), 502),
            (
                ServiceError::Ingest(IngestError::PathRejected("..".into())),
                400,
            ),
        ];
        for (err, status) in cases {
            let app: AppError = err.into();
            assert_eq!(app.http_status_code(), status, "{app}");
        }
    }
}
