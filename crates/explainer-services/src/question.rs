//! Question answering over an ingested repository
//!
//! Context is read from the repository's published snapshot, rendered into a
//! prompt for the [`AnswerProvider`], and the reply is parsed into an
//! [`Answer`]. Every answered question is kept as a [`QuestionRecord`], one
//! JSON document per question.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use explainer_core::models::{
    Answer, AskQuestionRequest, AudioFormat, CodeExplanation, CodeSnippet, QuestionRecord,
    Repository,
};
use explainer_core::validation::{validate_code_snippet, validate_question};
use explainer_ingest::IngestionService;
use explainer_storage::normalize_relative_path;
use serde::Deserialize;
use tokio::fs;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::audio::AudioService;
use crate::error::{ServiceError, ServiceResult};
use crate::explain::{build_explain_prompt, parse_explanation};
use crate::providers::AnswerProvider;

/// One file handed to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextFile {
    pub path: String,
    pub content: String,
}

pub struct QuestionService {
    ingest: Arc<IngestionService>,
    provider: Option<Arc<dyn AnswerProvider>>,
    audio: Option<Arc<AudioService>>,
    dir: PathBuf,
    max_context_bytes: usize,
    records: RwLock<HashMap<Uuid, QuestionRecord>>,
}

impl QuestionService {
    /// Load stored questions from `dir`, creating it if needed.
    pub async fn open(
        dir: impl Into<PathBuf>,
        ingest: Arc<IngestionService>,
        provider: Option<Arc<dyn AnswerProvider>>,
        audio: Option<Arc<AudioService>>,
        max_context_bytes: usize,
    ) -> ServiceResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| ServiceError::Internal(format!("questions dir: {}", e)))?;

        let records = load_records(&dir).await?;
        tracing::info!(count = records.len(), "Question records loaded");

        Ok(Self {
            ingest,
            provider,
            audio,
            dir,
            max_context_bytes,
            records: RwLock::new(records),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Answer a question about a ready repository and store the record.
    #[tracing::instrument(skip(self, req), fields(repository_id = %req.repository_id))]
    pub async fn ask(&self, req: AskQuestionRequest) -> ServiceResult<QuestionRecord> {
        validate_question(&req.question)?;

        let repository = self.ingest.get(&req.repository_id).await?;
        if !repository.is_ready() {
            return Err(ServiceError::NotReady(repository.id));
        }

        let provider = self
            .provider
            .as_ref()
            .ok_or(ServiceError::NotConfigured("GEMINI_API_KEY"))?;

        let context = self
            .collect_context(&repository.id, req.context_paths.as_deref())
            .await?;
        let prompt = build_prompt(&repository, &context, req.question.trim());

        let start = std::time::Instant::now();
        let raw = provider
            .generate(&prompt)
            .await
            .map_err(|e| ServiceError::Upstream(format!("answer generation failed: {}", e)))?;

        let context_paths: Vec<String> = context.iter().map(|c| c.path.clone()).collect();
        let mut answer = parse_answer(&raw, &context_paths);

        tracing::info!(
            model = provider.model_name(),
            context_files = context_paths.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Question answered"
        );

        if req.speak {
            answer.audio_id = self
                .speak(&answer.answer_text, req.audio_format.unwrap_or_default())
                .await;
        }

        let record = QuestionRecord {
            id: Uuid::new_v4(),
            repository_id: repository.id,
            question: req.question.trim().to_string(),
            context_paths,
            answer,
            created_at: Utc::now(),
        };

        let mut records = self.records.write().await;
        self.persist(&record).await?;
        records.insert(record.id, record.clone());

        Ok(record)
    }

    /// Analyze a standalone snippet. Nothing is stored.
    pub async fn explain(&self, code: &str) -> ServiceResult<CodeExplanation> {
        validate_code_snippet(code)?;

        let provider = self
            .provider
            .as_ref()
            .ok_or(ServiceError::NotConfigured("GEMINI_API_KEY"))?;

        let start = std::time::Instant::now();
        let raw = provider
            .generate(&build_explain_prompt(code))
            .await
            .map_err(|e| ServiceError::Upstream(format!("code analysis failed: {}", e)))?;

        tracing::info!(
            model = provider.model_name(),
            code_bytes = code.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Code explained"
        );

        Ok(parse_explanation(&raw))
    }

    /// Audio for an answer. Speech is best effort; the answer stands without it.
    async fn speak(&self, text: &str, format: AudioFormat) -> Option<Uuid> {
        let Some(audio) = &self.audio else {
            tracing::warn!("Speech requested but audio is not configured");
            return None;
        };
        match audio.synthesize(text, format, None).await {
            Ok(clip) => Some(clip.id),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to synthesize answer audio");
                None
            }
        }
    }

    /// Explicit files when given, otherwise textual files in catalog order
    /// until the byte budget runs out.
    async fn collect_context(
        &self,
        repository_id: &str,
        explicit: Option<&[String]>,
    ) -> ServiceResult<Vec<ContextFile>> {
        let mut context = Vec::new();
        let mut budget = self.max_context_bytes;

        if let Some(paths) = explicit.filter(|p| !p.is_empty()) {
            for path in paths {
                normalize_relative_path(path)?;
            }
            let snapshot = self.ingest.catalog(repository_id).await?;
            for path in paths {
                let (entry, bytes) = self.ingest.read_snapshot_file(&snapshot, path).await?;
                let content = String::from_utf8_lossy(&bytes);
                let content = truncate_to(&content, budget);
                budget -= content.len();
                context.push(ContextFile {
                    path: entry.path,
                    content,
                });
                if budget == 0 {
                    break;
                }
            }
            return Ok(context);
        }

        let snapshot = self.ingest.catalog(repository_id).await?;
        for entry in snapshot.entries() {
            if !entry.content_type.is_textual() || entry.size == 0 {
                continue;
            }
            if entry.size as usize > budget {
                continue;
            }
            let (_, bytes) = self.ingest.read_snapshot_file(&snapshot, &entry.path).await?;
            let content = String::from_utf8_lossy(&bytes).into_owned();
            budget = budget.saturating_sub(content.len());
            context.push(ContextFile {
                path: entry.path.clone(),
                content,
            });
            if budget == 0 {
                break;
            }
        }
        Ok(context)
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    async fn persist(&self, record: &QuestionRecord) -> ServiceResult<()> {
        let data = serde_json::to_vec_pretty(record)
            .map_err(|e| ServiceError::Internal(format!("record encoding: {}", e)))?;
        let path = self.record_path(record.id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data)
            .await
            .map_err(|e| ServiceError::Internal(format!("write question: {}", e)))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| ServiceError::Internal(format!("write question: {}", e)))
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<QuestionRecord> {
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("question {}", id)))
    }

    /// Questions asked about a repository, oldest first.
    pub async fn list_for_repository(&self, repository_id: &str) -> Vec<QuestionRecord> {
        let mut list: Vec<QuestionRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.repository_id == repository_id)
            .cloned()
            .collect();
        list.sort_by_key(|r| r.created_at);
        list
    }

    /// Drop every question recorded for a repository. Returns how many were removed.
    pub async fn delete_for_repository(&self, repository_id: &str) -> ServiceResult<usize> {
        let mut records = self.records.write().await;
        let ids: Vec<Uuid> = records
            .values()
            .filter(|r| r.repository_id == repository_id)
            .map(|r| r.id)
            .collect();
        for id in &ids {
            match fs::remove_file(self.record_path(*id)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(ServiceError::Internal(format!("remove question: {}", e))),
            }
            records.remove(id);
        }
        Ok(ids.len())
    }
}

async fn load_records(dir: &Path) -> ServiceResult<HashMap<Uuid, QuestionRecord>> {
    let io = |e: std::io::Error| ServiceError::Internal(format!("load questions: {}", e));
    let mut records = HashMap::new();
    let mut read_dir = fs::read_dir(dir).await.map_err(io)?;
    while let Some(entry) = read_dir.next_entry().await.map_err(io)? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let bytes = fs::read(&path).await.map_err(io)?;
        match serde_json::from_slice::<QuestionRecord>(&bytes) {
            Ok(record) => {
                records.insert(record.id, record);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable question record")
            }
        }
    }
    Ok(records)
}

/// Longest prefix of `s` within `max` bytes that ends on a char boundary.
fn truncate_to(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

pub fn build_prompt(repository: &Repository, context: &[ContextFile], question: &str) -> String {
    let mut parts = vec!["You are an expert code explainer.".to_string()];

    let mut repo_desc = format!("Repository: {}", repository.name);
    if let Some(description) = &repository.description {
        repo_desc.push_str(&format!(" - {}", description));
    }
    parts.push(repo_desc);

    if !context.is_empty() {
        let mut code = String::from("Here is the relevant code context:\n");
        for file in context {
            code.push_str(&format!("\n--- {} ---\n```\n{}\n```\n", file.path, file.content));
        }
        parts.push(code);
    }

    parts.push(format!("Question: {}", question));

    parts.push(
        r#"Please provide a clear, concise explanation that would help a developer understand this code.
Include code snippets where relevant, and explain the reasoning behind implementation choices.

Format your response as JSON with the following structure:
{
    "text_response": "Your detailed explanation here",
    "code_snippets": [
        {"path": "file/path", "language": "language_name", "code": "code_here"}
    ],
    "references": [
        {"type": "file/documentation/pattern/library", "name": "reference_name", "description": "brief_description"}
    ]
}"#
        .to_string(),
    );

    parts.join("\n\n")
}

#[derive(Debug, Deserialize)]
struct ModelReply {
    text_response: Option<String>,
    #[serde(default)]
    code_snippets: Vec<ModelSnippet>,
    #[serde(default)]
    references: Vec<ModelReference>,
}

#[derive(Debug, Deserialize)]
struct ModelSnippet {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    code: String,
}

#[derive(Debug, Deserialize)]
struct ModelReference {
    #[serde(default)]
    name: Option<String>,
}

/// Drop a surrounding ```json fence if the model added one.
pub(crate) fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Structured answer from the model's reply; falls back to the raw text when
/// the reply is not the requested JSON.
pub fn parse_answer(raw: &str, context_paths: &[String]) -> Answer {
    let body = strip_fences(raw);

    let (answer_text, code_snippets, reference_names) =
        match serde_json::from_str::<ModelReply>(body) {
            Ok(reply) => (
                reply
                    .text_response
                    .unwrap_or_else(|| "No response generated".to_string()),
                reply
                    .code_snippets
                    .into_iter()
                    .filter(|s| !s.code.is_empty())
                    .map(|s| CodeSnippet {
                        path: s.path,
                        language: s.language,
                        code: s.code,
                    })
                    .collect::<Vec<_>>(),
                reply
                    .references
                    .into_iter()
                    .filter_map(|r| r.name)
                    .collect::<Vec<_>>(),
            ),
            Err(_) => {
                tracing::warn!(
                    preview = %body.chars().take(100).collect::<String>(),
                    "Non-JSON answer from model"
                );
                (raw.trim().to_string(), Vec::new(), Vec::new())
            }
        };

    let referenced_paths = context_paths
        .iter()
        .filter(|path| {
            answer_text.contains(path.as_str())
                || code_snippets
                    .iter()
                    .any(|s| s.path.as_deref() == Some(path.as_str()))
                || reference_names.iter().any(|n| n == *path)
        })
        .cloned()
        .collect();

    Answer {
        answer_text,
        referenced_paths,
        code_snippets,
        audio_id: None,
    }
}
