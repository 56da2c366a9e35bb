//! Domain methods for the Explainer API client.
//!
//! Response types are re-exported from `explainer_core::models` where possible.
//! Delete responses are defined here.

use crate::{ApiClient, API_PREFIX};
use anyhow::{Context, Result};
use bytes::Bytes;
use explainer_core::models::{
    AskQuestionRequest, AudioFormat, CatalogResponse, ExplainCodeRequest, ExplainCodeResponse,
    QuestionRecord, Repository, RepositoryStatus, SynthesizeRequest, SynthesizeResponse,
};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};
use uuid::Uuid;

/// Matches DELETE /api/repositories/{id}.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteRepositoryResponse {
    pub id: String,
    pub status: RepositoryStatus,
    pub questions_removed: usize,
}

/// Matches DELETE /api/audio/{id}.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteAudioResponse {
    pub audio_id: Uuid,
    pub deleted: bool,
}

/// Where a new repository comes from.
#[derive(Debug, Clone)]
pub enum RepositorySource {
    Remote { url: String, branch: Option<String> },
    ArchiveFile(String),
}

/// Optional fields for a new repository.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Block until ingestion settles.
    pub wait: bool,
}

/// Percent-encode each segment of a repository path, keeping the separators.
fn encode_repo_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn repo_path(id: &str) -> String {
    format!("{}/repositories/{}", API_PREFIX, urlencoding::encode(id))
}

impl ApiClient {
    /// Create a repository from a remote URL or a local archive file.
    pub async fn create_repository(
        &self,
        source: RepositorySource,
        options: CreateOptions,
    ) -> Result<Repository> {
        let query = vec![("wait", options.wait.to_string())];

        match source {
            RepositorySource::Remote { url, branch } => {
                let mut body = serde_json::json!({ "url": url });
                for (key, value) in [
                    ("branch", branch),
                    ("id", options.id),
                    ("name", options.name),
                    ("description", options.description),
                ] {
                    if let Some(value) = value {
                        body[key] = serde_json::Value::String(value);
                    }
                }
                self.post_json(&format!("{}/repositories", API_PREFIX), &query, &body)
                    .await
            }
            RepositorySource::ArchiveFile(file_path) => {
                let path = Path::new(&file_path);
                if path.components().any(|c| c == Component::ParentDir) {
                    return Err(anyhow::anyhow!("Invalid input: {}", path.display()));
                }
                let buffer = read_archive(path)?;
                let filename = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("repository.zip")
                    .to_string();

                let mut form = reqwest::multipart::Form::new();
                for (key, value) in [
                    ("id", options.id),
                    ("name", options.name),
                    ("description", options.description),
                ] {
                    if let Some(value) = value {
                        form = form.text(key, value);
                    }
                }
                let form =
                    form.part("file", reqwest::multipart::Part::bytes(buffer).file_name(filename));

                self.post_multipart(&format!("{}/repositories/upload", API_PREFIX), &query, form)
                    .await
            }
        }
    }

    pub async fn list_repositories(&self) -> Result<Vec<Repository>> {
        self.get(&format!("{}/repositories", API_PREFIX), &[]).await
    }

    pub async fn get_repository(&self, id: &str) -> Result<Repository> {
        self.get(&repo_path(id), &[]).await
    }

    /// File catalog, optionally restricted to one extension.
    pub async fn list_files(&self, id: &str, extension: Option<&str>) -> Result<CatalogResponse> {
        let query: Vec<(&str, String)> = extension
            .map(|e| vec![("extension", e.to_string())])
            .unwrap_or_default();
        self.get(&format!("{}/files", repo_path(id)), &query).await
    }

    /// Raw content of one repository file.
    pub async fn read_file(&self, id: &str, path: &str) -> Result<Bytes> {
        let (_, bytes) = self
            .get_bytes(&format!("{}/files/{}", repo_path(id), encode_repo_path(path)))
            .await?;
        Ok(bytes)
    }

    pub async fn delete_repository(&self, id: &str) -> Result<DeleteRepositoryResponse> {
        self.delete(&repo_path(id)).await
    }

    /// Ask a question; `speak` also synthesizes the answer.
    pub async fn ask(
        &self,
        repository_id: &str,
        question: &str,
        context_paths: Vec<String>,
        speak: Option<AudioFormat>,
    ) -> Result<QuestionRecord> {
        let body = AskQuestionRequest {
            repository_id: repository_id.to_string(),
            question: question.to_string(),
            context_paths: (!context_paths.is_empty()).then_some(context_paths),
            speak: speak.is_some(),
            audio_format: speak,
        };
        self.post_json(&format!("{}/questions", API_PREFIX), &[], &body)
            .await
    }

    pub async fn get_question(&self, id: Uuid) -> Result<QuestionRecord> {
        self.get(&format!("{}/questions/{}", API_PREFIX, id), &[])
            .await
    }

    pub async fn list_questions(&self, repository_id: &str) -> Result<Vec<QuestionRecord>> {
        self.get(&format!("{}/questions", repo_path(repository_id)), &[])
            .await
    }

    /// Analyze a standalone snippet.
    pub async fn explain(&self, code: &str) -> Result<ExplainCodeResponse> {
        let body = ExplainCodeRequest {
            code: code.to_string(),
        };
        self.post_json(&format!("{}/explain", API_PREFIX), &[], &body)
            .await
    }

    pub async fn synthesize(
        &self,
        text: &str,
        format: AudioFormat,
        voice_id: Option<String>,
    ) -> Result<SynthesizeResponse> {
        let body = SynthesizeRequest {
            text: text.to_string(),
            format,
            voice_id,
        };
        self.post_json(&format!("{}/audio", API_PREFIX), &[], &body)
            .await
    }

    pub async fn fetch_audio(&self, id: Uuid) -> Result<Bytes> {
        let (_, bytes) = self
            .get_bytes(&format!("{}/audio/{}", API_PREFIX, id))
            .await?;
        Ok(bytes)
    }

    pub async fn delete_audio(&self, id: Uuid) -> Result<DeleteAudioResponse> {
        self.delete(&format!("{}/audio/{}", API_PREFIX, id)).await
    }
}

fn read_archive(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))
}
