//! Service wiring: storage, ingestion, Q&A and speech

use anyhow::{Context, Result};
use explainer_core::Config;
use explainer_ingest::{
    DefaultAcquirer, IngestionService, Quota, RepositoryRegistry, SourceAcquirer,
};
use explainer_services::{
    AnswerProvider, AudioService, GeminiProvider, HttpSpeechSynthesizer, QuestionService,
    SpeechSynthesizer,
};
use explainer_storage::{LocalSnapshotStore, LocalStorage};
use std::sync::Arc;

use crate::state::AppState;

/// Pluggable backends for the services. `from_config` builds the real ones;
/// tests swap in fakes.
#[derive(Clone)]
pub struct Providers {
    pub acquirer: Arc<dyn SourceAcquirer>,
    pub answers: Option<Arc<dyn AnswerProvider>>,
    pub speech: Option<Arc<dyn SpeechSynthesizer>>,
}

impl Providers {
    pub fn from_config(config: &Config) -> Result<Self> {
        let acquirer = Arc::new(DefaultAcquirer::new(
            config.git_path(),
            config.allowed_git_hosts().map(|hosts| hosts.to_vec()),
        ));

        let answers: Option<Arc<dyn AnswerProvider>> = match config.gemini_api_key() {
            Some(key) => {
                let provider =
                    GeminiProvider::new(key, config.gemini_model(), config.gemini_base_url())?;
                tracing::info!(model = %config.gemini_model(), "Gemini answer provider enabled");
                Some(Arc::new(provider))
            }
            None => {
                tracing::warn!("GEMINI_API_KEY not set, question answering disabled");
                None
            }
        };

        let speech: Option<Arc<dyn SpeechSynthesizer>> = match config.tts_api_url() {
            Some(url) => {
                let synthesizer = HttpSpeechSynthesizer::new(
                    url,
                    config.tts_api_key().map(String::from),
                    config.tts_voice_id().map(String::from),
                )?;
                tracing::info!(url = %url, "Speech synthesis enabled");
                Some(Arc::new(synthesizer))
            }
            None => {
                tracing::warn!("TTS_API_URL not set, speech synthesis disabled");
                None
            }
        };

        Ok(Self {
            acquirer,
            answers,
            speech,
        })
    }
}

/// Open the stores under the configured directories and build the services.
pub async fn initialize_services(config: &Config, providers: Providers) -> Result<Arc<AppState>> {
    let store = LocalSnapshotStore::open(config.snapshots_dir())
        .await
        .context("Failed to open snapshot store")?;
    let registry = RepositoryRegistry::open(config.repositories_dir())
        .await
        .context("Failed to open repository registry")?;

    let quota = Quota::new(
        config.max_repository_size_bytes(),
        config.max_repository_files(),
    );
    let ingest = Arc::new(IngestionService::new(
        Arc::new(store),
        Arc::new(registry),
        providers.acquirer,
        config.staging_dir(),
        quota,
        config.ingest_timeout(),
    ));
    ingest
        .reconcile()
        .await
        .context("Failed to reconcile snapshots with repository records")?;

    let blob_storage = LocalStorage::new(config.audio_dir().clone())
        .await
        .context("Failed to open audio storage")?;
    let audio = Arc::new(AudioService::new(Arc::new(blob_storage), providers.speech));

    let questions = Arc::new(
        QuestionService::open(
            config.questions_dir(),
            ingest.clone(),
            providers.answers,
            audio.is_enabled().then(|| audio.clone()),
            config.qa_max_context_bytes(),
        )
        .await
        .context("Failed to open question store")?,
    );

    tracing::info!(
        snapshots_dir = %config.snapshots_dir().display(),
        audio_dir = %config.audio_dir().display(),
        repositories = ingest.list().await.len(),
        "Services initialized"
    );

    Ok(Arc::new(AppState {
        config: config.clone(),
        ingest,
        questions,
        audio,
    }))
}
