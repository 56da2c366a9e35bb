//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use explainer_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Explainer API",
        version = "0.1.0",
        description = "Ingests git repositories and uploaded archives into immutable snapshots, serves their file catalogs and contents, answers questions about the code and turns answers into speech."
    ),
    paths(
        // Repositories
        handlers::repositories::create_repository,
        handlers::repositories::upload_repository,
        handlers::repositories::list_repositories,
        handlers::repositories::get_repository,
        handlers::repositories::list_files,
        handlers::repositories::read_file,
        handlers::repositories::delete_repository,
        // Questions
        handlers::questions::ask_question,
        handlers::questions::get_question,
        handlers::questions::list_repository_questions,
        handlers::questions::explain_code,
        // Audio
        handlers::audio::synthesize_audio,
        handlers::audio::get_audio,
        handlers::audio::delete_audio,
    ),
    components(
        schemas(
            error::ErrorResponse,
            models::Repository,
            models::RepositoryStatus,
            models::RepositoryOrigin,
            models::ArchiveFormat,
            models::IngestErrorKind,
            models::IngestFailure,
            models::ContentCategory,
            models::FileEntry,
            models::CatalogResponse,
            models::AskQuestionRequest,
            models::QuestionRecord,
            models::Answer,
            models::CodeSnippet,
            models::ExplainCodeRequest,
            models::ExplainCodeResponse,
            models::CodeExplanation,
            models::CodeComponent,
            models::AudioFormat,
            models::SynthesizeRequest,
            models::SynthesizeResponse,
            handlers::repositories::CreateRepositoryRequest,
            handlers::repositories::DeleteRepositoryResponse,
            handlers::audio::DeleteAudioResponse,
        )
    ),
    tags(
        (name = "repositories", description = "Repository ingestion, catalogs and file contents"),
        (name = "questions", description = "Questions about ingested code and standalone snippets"),
        (name = "audio", description = "Speech synthesis")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
