//! Health check handlers and response types.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::fmt::Display;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Run an async check with timeout; returns status string "healthy", "timeout", or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

async fn directory_present(path: PathBuf) -> Result<(), String> {
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(format!("{} is not a directory", path.display())),
        Err(e) => Err(format!("{}: {}", path.display(), e)),
    }
}

fn feature_status(enabled: bool) -> &'static str {
    if enabled {
        "configured"
    } else {
        "not_configured"
    }
}

#[derive(serde::Serialize)]
pub(super) struct HealthCheckResponse {
    pub status: String,
    pub snapshots: String,
    pub audio_storage: String,
    pub repositories: usize,
    pub question_answering: &'static str,
    pub speech: &'static str,
}

/// Liveness check: the process is running.
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Full health check: storage directories plus which providers are configured.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    const TIMEOUT: Duration = Duration::from_secs(5);

    let snapshots = run_check(
        TIMEOUT,
        directory_present(state.config.snapshots_dir()),
        "unhealthy",
    )
    .await;
    let audio_storage = run_check(
        TIMEOUT,
        directory_present(state.config.audio_dir().clone()),
        "degraded",
    )
    .await;

    let overall_healthy = snapshots == "healthy";
    let response = HealthCheckResponse {
        status: if overall_healthy { "healthy" } else { "unhealthy" }.to_string(),
        snapshots,
        audio_storage,
        repositories: state.ingest.list().await.len(),
        question_answering: feature_status(state.questions.is_enabled()),
        speech: feature_status(state.audio.is_enabled()),
    };

    let status_code = if overall_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
