//! Route configuration and setup.
//!
//! Health checks live in [health](health); everything else maps one route to one handler.

mod health;

use crate::constants::OPENAPI_PATH;
use crate::handlers::{audio, questions, repositories};
use crate::middleware::request_id_middleware;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use explainer_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Headroom on top of the archive size for multipart framing and text fields.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let http_concurrency_limit = config.http_concurrency_limit().max(1);
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        "HTTP concurrency limit layer enabled"
    );

    let request_timeout = config.request_timeout();
    tracing::info!(
        request_timeout_secs = request_timeout.as_secs(),
        "Request timeout layer enabled"
    );

    let body_limit = config
        .max_upload_size_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let app = api_routes()
        .merge(health_routes())
        .route(OPENAPI_PATH, get(|| async { Json(crate::api_doc::get_openapi_spec()) }))
        .merge(utoipa_rapidoc::RapiDoc::new(OPENAPI_PATH).path("/docs"))
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}

fn health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/repositories",
            post(repositories::create_repository).get(repositories::list_repositories),
        )
        .route(
            "/api/repositories/upload",
            post(repositories::upload_repository),
        )
        .route(
            "/api/repositories/{id}",
            get(repositories::get_repository).delete(repositories::delete_repository),
        )
        .route("/api/repositories/{id}/files", get(repositories::list_files))
        .route(
            "/api/repositories/{id}/files/{*path}",
            get(repositories::read_file),
        )
        .route(
            "/api/repositories/{id}/questions",
            get(questions::list_repository_questions),
        )
        .route("/api/questions", post(questions::ask_question))
        .route("/api/explain", post(questions::explain_code))
        .route("/api/questions/{id}", get(questions::get_question))
        .route("/api/audio", post(audio::synthesize_audio))
        .route(
            "/api/audio/{id}",
            get(audio::get_audio).delete(audio::delete_audio),
        )
}
