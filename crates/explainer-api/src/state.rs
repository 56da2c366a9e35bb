//! Application state shared by all handlers.

use explainer_core::Config;
use explainer_ingest::IngestionService;
use explainer_services::{AudioService, QuestionService};
use std::sync::Arc;

/// Services created once at startup and handed to handlers through axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub ingest: Arc<IngestionService>,
    pub questions: Arc<QuestionService>,
    pub audio: Arc<AudioService>,
}
