//! In-process stand-ins for the third-party providers.

use async_trait::async_trait;
use bytes::Bytes;
use explainer_core::models::{AudioFormat, RepositoryOrigin};
use explainer_ingest::acquirer::GitCloner;
use explainer_ingest::{DefaultAcquirer, IngestResult, Quota, SourceAcquirer, SourceInput};
use explainer_services::{AnswerProvider, SpeechSynthesizer, SynthesizedSpeech};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

pub const CANNED_ANSWER: &str = r#"{
  "text_response": "greet() in src/greet.rs prints a greeting.",
  "code_snippets": [{"path": "src/greet.rs", "language": "rust", "code": "pub fn greet() {}"}],
  "references": [{"name": "src/greet.rs"}]
}"#;

pub const CANNED_ANALYSIS: &str = r#"{
  "overview": "Prints a greeting.",
  "key_components": [{"name": "greet", "type": "function", "purpose": "prints hi"}],
  "potential_issues": [],
  "suggested_improvements": ["take the name as a parameter"]
}"#;

/// Replies with a fixed JSON answer (or analysis, for snippet prompts) and
/// records every prompt it saw.
#[derive(Default)]
pub struct CannedAnswers {
    pub prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl AnswerProvider for CannedAnswers {
    fn model_name(&self) -> &str {
        "canned"
    }

    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if prompt.starts_with("You are an expert code analyzer") {
            return Ok(CANNED_ANALYSIS.to_string());
        }
        Ok(CANNED_ANSWER.to_string())
    }
}

pub struct FailingAnswers;

#[async_trait]
impl AnswerProvider for FailingAnswers {
    fn model_name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("model overloaded"))
    }
}

/// Returns `TONE:{format}:{text}` as the "audio", one second long.
pub struct ToneSynthesizer;

#[async_trait]
impl SpeechSynthesizer for ToneSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        format: AudioFormat,
        _voice_id: Option<&str>,
    ) -> anyhow::Result<SynthesizedSpeech> {
        Ok(SynthesizedSpeech {
            audio: Bytes::from(format!("TONE:{}:{}", format, text)),
            duration_seconds: Some(1.0),
        })
    }
}

/// Archive acquirer that blocks every acquisition until `release` is called.
pub struct GatedAcquirer {
    inner: DefaultAcquirer,
    gate: Arc<Notify>,
}

impl GatedAcquirer {
    pub fn new() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        (
            GatedAcquirer {
                inner: DefaultAcquirer::new("git", None),
                gate: gate.clone(),
            },
            gate,
        )
    }
}

#[async_trait]
impl SourceAcquirer for GatedAcquirer {
    fn validate(&self, input: &SourceInput) -> IngestResult<RepositoryOrigin> {
        self.inner.validate(input)
    }

    async fn acquire(
        &self,
        input: &SourceInput,
        dest: &Path,
        quota: Quota,
        cancel: &CancellationToken,
    ) -> IngestResult<()> {
        self.gate.notified().await;
        self.inner.acquire(input, dest, quota, cancel).await
    }
}

/// Clones local paths, which the production acquirer refuses, so tests can
/// ingest a repository created on disk with the `git` binary.
pub struct LocalGitAcquirer {
    cloner: GitCloner,
}

impl LocalGitAcquirer {
    pub fn new() -> Self {
        LocalGitAcquirer {
            cloner: GitCloner::new("git"),
        }
    }
}

#[async_trait]
impl SourceAcquirer for LocalGitAcquirer {
    fn validate(&self, input: &SourceInput) -> IngestResult<RepositoryOrigin> {
        match input {
            SourceInput::Remote { url, branch } => Ok(RepositoryOrigin::Remote {
                url: url.clone(),
                branch: branch.clone(),
            }),
            SourceInput::Archive { .. } => DefaultAcquirer::new("git", None).validate(input),
        }
    }

    async fn acquire(
        &self,
        input: &SourceInput,
        dest: &Path,
        quota: Quota,
        cancel: &CancellationToken,
    ) -> IngestResult<()> {
        match input {
            SourceInput::Remote { url, branch } => {
                self.cloner
                    .clone_into(url, branch.as_deref(), dest, quota, cancel)
                    .await
            }
            SourceInput::Archive { .. } => unreachable!("archives are not used with this fake"),
        }
    }
}
