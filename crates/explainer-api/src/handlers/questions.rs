use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use explainer_core::models::{
    AskQuestionRequest, ExplainCodeRequest, ExplainCodeResponse, QuestionRecord,
};
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/questions",
    tag = "questions",
    request_body = AskQuestionRequest,
    responses(
        (status = 201, description = "Question answered and stored", body = QuestionRecord),
        (status = 400, description = "Invalid question or context path", body = ErrorResponse),
        (status = 404, description = "Repository or context file not found", body = ErrorResponse),
        (status = 409, description = "Repository is not ready", body = ErrorResponse),
        (status = 502, description = "Answer provider failed", body = ErrorResponse),
        (status = 503, description = "No answer provider configured", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, body),
    fields(repository_id = %body.repository_id, speak = body.speak, operation = "ask_question")
)]
pub async fn ask_question(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<AskQuestionRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state.questions.ask(body).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    post,
    path = "/api/explain",
    tag = "questions",
    request_body = ExplainCodeRequest,
    responses(
        (status = 200, description = "Structured explanation of the snippet", body = ExplainCodeResponse),
        (status = 400, description = "No code provided", body = ErrorResponse),
        (status = 413, description = "Snippet too large", body = ErrorResponse),
        (status = 502, description = "Answer provider failed", body = ErrorResponse),
        (status = 503, description = "No answer provider configured", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, body), fields(code_len = body.code.len(), operation = "explain_code"))]
pub async fn explain_code(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<ExplainCodeRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let explanation = state.questions.explain(&body.code).await?;
    Ok(Json(ExplainCodeResponse { explanation }))
}

#[utoipa::path(
    get,
    path = "/api/questions/{id}",
    tag = "questions",
    params(
        ("id" = Uuid, Path, description = "Question ID")
    ),
    responses(
        (status = 200, description = "Question found", body = QuestionRecord),
        (status = 404, description = "Question not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(question_id = %id, operation = "get_question"))]
pub async fn get_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.questions.get(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/repositories/{id}/questions",
    tag = "questions",
    params(
        ("id" = String, Path, description = "Repository ID")
    ),
    responses(
        (status = 200, description = "Questions asked about the repository, oldest first", body = Vec<QuestionRecord>),
        (status = 404, description = "Repository not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(repository_id = %id, operation = "list_questions"))]
pub async fn list_repository_questions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.ingest.get(&id).await?;
    Ok(Json(state.questions.list_for_repository(&id).await))
}
