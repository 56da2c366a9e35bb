//! Repository ingestion, catalog and file endpoints

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use crate::utils::upload::extract_archive_upload;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use explainer_core::models::{CatalogResponse, Repository, RepositoryStatus};
use explainer_core::AppError;
use explainer_ingest::{IngestRequest, SourceInput};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRepositoryRequest {
    /// Clone URL (https, http, ssh, git or `user@host:path`)
    pub url: String,
    #[serde(default)]
    pub branch: Option<String>,
    /// Caller-chosen id matching `[A-Za-z0-9_-]{1,64}`; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct IngestQuery {
    /// Block until ingestion settles and report its outcome
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CatalogQuery {
    /// Only list files with this extension (case-insensitive, leading dot optional)
    pub extension: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteRepositoryResponse {
    pub id: String,
    pub status: RepositoryStatus,
    /// Stored questions removed along with the repository
    pub questions_removed: usize,
}

/// Start an ingestion and answer either right away with the pending record or,
/// with `wait`, once it has settled.
async fn start_ingestion(
    state: &AppState,
    request: IngestRequest,
    wait: bool,
) -> Result<(StatusCode, Json<Repository>), HttpAppError> {
    let prepared = state.ingest.begin(request).await?;

    if !wait {
        let pending = prepared.repository().clone();
        drop(state.ingest.spawn(prepared));
        return Ok((StatusCode::CREATED, Json(pending)));
    }

    // Runs on its own task so a dropped request cannot strand the record
    let settled = state.ingest.complete(prepared).await?;
    match settled.status {
        RepositoryStatus::Failed => {
            let failure = settled.failure.clone().ok_or_else(|| {
                AppError::Internal(format!("repository {} failed without a reason", settled.id))
            })?;
            Err(AppError::from_ingest_kind(failure.kind, failure.message).into())
        }
        RepositoryStatus::Deleted => Err(AppError::NotFound(format!(
            "repository {} was deleted during ingestion",
            settled.id
        ))
        .into()),
        _ => Ok((StatusCode::CREATED, Json(settled))),
    }
}

#[utoipa::path(
    post,
    path = "/api/repositories",
    tag = "repositories",
    params(IngestQuery),
    request_body = CreateRepositoryRequest,
    responses(
        (status = 201, description = "Ingestion accepted (or finished, with wait=true)", body = Repository),
        (status = 400, description = "Invalid id or request body", body = ErrorResponse),
        (status = 409, description = "An ingestion for this id is already running", body = ErrorResponse),
        (status = 413, description = "Repository exceeds quota", body = ErrorResponse),
        (status = 422, description = "Invalid origin", body = ErrorResponse),
        (status = 502, description = "Remote unreachable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, body), fields(url = %body.url, operation = "create_repository"))]
pub async fn create_repository(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IngestQuery>,
    ValidatedJson(body): ValidatedJson<CreateRepositoryRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let request = IngestRequest {
        id: body.id,
        name: body.name,
        description: body.description,
        source: SourceInput::Remote {
            url: body.url,
            branch: body.branch,
        },
    };
    start_ingestion(&state, request, query.wait).await
}

#[utoipa::path(
    post,
    path = "/api/repositories/upload",
    tag = "repositories",
    params(IngestQuery),
    request_body(content_type = "multipart/form-data", description = "Archive in field `file` (zip, tar, tar.gz) plus optional `id`, `name`, `description`"),
    responses(
        (status = 201, description = "Ingestion accepted (or finished, with wait=true)", body = Repository),
        (status = 400, description = "Missing file or invalid field", body = ErrorResponse),
        (status = 409, description = "An ingestion for this id is already running", body = ErrorResponse),
        (status = 413, description = "Upload or repository too large", body = ErrorResponse),
        (status = 422, description = "Corrupt or unsupported archive", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_repository"))]
pub async fn upload_repository(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IngestQuery>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let upload = extract_archive_upload(multipart, state.config.max_upload_size_bytes()).await?;

    tracing::debug!(
        filename = %upload.filename,
        size_bytes = upload.data.len(),
        "Archive upload received"
    );

    let request = IngestRequest {
        id: upload.id,
        name: upload.name,
        description: upload.description,
        source: SourceInput::Archive {
            filename: upload.filename,
            data: upload.data,
        },
    };
    start_ingestion(&state, request, query.wait).await
}

#[utoipa::path(
    get,
    path = "/api/repositories",
    tag = "repositories",
    responses(
        (status = 200, description = "All known repositories, newest first", body = Vec<Repository>)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "list_repositories"))]
pub async fn list_repositories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.ingest.list().await))
}

#[utoipa::path(
    get,
    path = "/api/repositories/{id}",
    tag = "repositories",
    params(
        ("id" = String, Path, description = "Repository ID")
    ),
    responses(
        (status = 200, description = "Repository found", body = Repository),
        (status = 404, description = "Repository not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(repository_id = %id, operation = "get_repository"))]
pub async fn get_repository(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.ingest.get(&id).await?))
}

#[utoipa::path(
    get,
    path = "/api/repositories/{id}/files",
    tag = "repositories",
    params(
        ("id" = String, Path, description = "Repository ID"),
        CatalogQuery
    ),
    responses(
        (status = 200, description = "File catalog in depth-first lexical order", body = CatalogResponse),
        (status = 404, description = "Repository or snapshot not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(repository_id = %id, operation = "list_files"))]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let snapshot = state.ingest.catalog(&id).await?;
    Ok(Json(CatalogResponse::from_snapshot(
        &snapshot,
        query.extension.as_deref(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/repositories/{id}/files/{path}",
    tag = "repositories",
    params(
        ("id" = String, Path, description = "Repository ID"),
        ("path" = String, Path, description = "File path relative to the repository root")
    ),
    responses(
        (status = 200, description = "Raw file content", content_type = "application/octet-stream"),
        (status = 400, description = "Path escapes the repository root", body = ErrorResponse),
        (status = 404, description = "Repository or file not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(repository_id = %id, path = %path, operation = "read_file"))]
pub async fn read_file(
    State(state): State<Arc<AppState>>,
    Path((id, path)): Path<(String, String)>,
) -> Result<impl IntoResponse, HttpAppError> {
    let (entry, bytes) = state.ingest.read_file(&id, &path).await?;
    Ok((
        [
            (header::CONTENT_TYPE, entry.mime_type),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        bytes,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/repositories/{id}",
    tag = "repositories",
    params(
        ("id" = String, Path, description = "Repository ID")
    ),
    responses(
        (status = 200, description = "Repository deleted (or was already gone)", body = DeleteRepositoryResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(repository_id = %id, operation = "delete_repository"))]
pub async fn delete_repository(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.ingest.delete(&id).await?;
    let questions_removed = state.questions.delete_for_repository(&id).await?;

    Ok(Json(DeleteRepositoryResponse {
        id,
        status: RepositoryStatus::Deleted,
        questions_removed,
    }))
}
