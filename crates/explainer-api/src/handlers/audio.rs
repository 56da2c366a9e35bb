use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use explainer_core::models::{SynthesizeRequest, SynthesizeResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteAudioResponse {
    pub audio_id: Uuid,
    pub deleted: bool,
}

#[utoipa::path(
    post,
    path = "/api/audio",
    tag = "audio",
    request_body = SynthesizeRequest,
    responses(
        (status = 201, description = "Speech synthesized and stored", body = SynthesizeResponse),
        (status = 400, description = "Empty or oversized text", body = ErrorResponse),
        (status = 502, description = "Speech provider failed", body = ErrorResponse),
        (status = 503, description = "No speech provider configured", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, body), fields(format = %body.format, operation = "synthesize_audio"))]
pub async fn synthesize_audio(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<SynthesizeRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let clip = state
        .audio
        .synthesize(&body.text, body.format, body.voice_id.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SynthesizeResponse {
            audio_id: clip.id,
            format: clip.format,
            url: format!("/api/audio/{}", clip.id),
            duration_seconds: clip.duration_seconds,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/audio/{id}",
    tag = "audio",
    params(
        ("id" = Uuid, Path, description = "Audio ID")
    ),
    responses(
        (status = 200, description = "Encoded audio", content_type = "audio/mpeg"),
        (status = 404, description = "Audio not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(audio_id = %id, operation = "get_audio"))]
pub async fn get_audio(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let (format, bytes) = state.audio.fetch(id).await?;
    Ok(([(header::CONTENT_TYPE, format.content_type())], bytes))
}

#[utoipa::path(
    delete,
    path = "/api/audio/{id}",
    tag = "audio",
    params(
        ("id" = Uuid, Path, description = "Audio ID")
    ),
    responses(
        (status = 200, description = "Audio deleted", body = DeleteAudioResponse),
        (status = 404, description = "Audio not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(audio_id = %id, operation = "delete_audio"))]
pub async fn delete_audio(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.audio.remove(id).await?;
    Ok(Json(DeleteAudioResponse {
        audio_id: id,
        deleted: true,
    }))
}
