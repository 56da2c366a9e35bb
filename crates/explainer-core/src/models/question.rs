use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::AudioFormat;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct CodeSnippet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub code: String,
}

/// Answer produced for a question about a repository.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Answer {
    pub answer_text: String,
    pub referenced_paths: Vec<String>,
    #[serde(default)]
    pub code_snippets: Vec<CodeSnippet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuestionRecord {
    pub id: Uuid,
    pub repository_id: String,
    pub question: String,
    /// Files that were sent to the model as context.
    pub context_paths: Vec<String>,
    pub answer: Answer,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AskQuestionRequest {
    pub repository_id: String,
    pub question: String,
    /// Explicit files to use as context; defaults to the repository's text files.
    #[serde(default)]
    pub context_paths: Option<Vec<String>>,
    /// Also synthesize the answer to speech.
    #[serde(default)]
    pub speak: bool,
    #[serde(default)]
    pub audio_format: Option<AudioFormat>,
}

/// A snippet to explain on its own, outside any repository.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExplainCodeRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct CodeComponent {
    pub name: String,
    /// Function, type, module and so on, as the model describes it.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub purpose: String,
}

/// Structured analysis of a snippet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct CodeExplanation {
    pub overview: String,
    #[serde(default)]
    pub key_components: Vec<CodeComponent>,
    #[serde(default)]
    pub potential_issues: Vec<String>,
    #[serde(default)]
    pub suggested_improvements: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExplainCodeResponse {
    pub explanation: CodeExplanation,
}
