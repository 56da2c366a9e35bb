//! Configuration module
//!
//! This module provides the configuration for the API server and its services:
//! storage locations, ingestion quotas, and the third-party LLM and speech providers.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_INGEST_TIMEOUT_SECS, DEFAULT_MAX_REPOSITORY_FILES, DEFAULT_MAX_REPOSITORY_SIZE_MB,
    DEFAULT_MAX_UPLOAD_SIZE_MB, DEFAULT_QA_MAX_CONTEXT_BYTES, MB,
};

// Common constants
const SERVER_PORT: u16 = 8000;
const REQUEST_TIMEOUT_SECS: u64 = 60;
const HTTP_CONCURRENCY_LIMIT: usize = 1024;
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Explainer server configuration
#[derive(Clone, Debug)]
pub struct ExplainerConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub log_format: String,
    pub request_timeout_secs: u64,
    pub http_concurrency_limit: usize,
    // Storage locations
    pub data_dir: PathBuf,
    pub audio_dir: PathBuf,
    // Ingestion limits
    pub max_repository_size_bytes: u64,
    pub max_repository_files: usize,
    pub max_upload_size_bytes: usize,
    pub ingest_timeout_secs: u64,
    pub git_path: String,
    // Optional allowlist of clone hosts, e.g. "github.com,gitlab.com"
    pub allowed_git_hosts: Option<Vec<String>>,
    // Q&A provider (Gemini)
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub qa_max_context_bytes: usize,
    // Speech provider
    pub tts_api_url: Option<String>,
    pub tts_api_key: Option<String>,
    pub tts_voice_id: Option<String>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ExplainerConfig>);

impl Config {
    fn inner(&self) -> &ExplainerConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_name(&self.inner().environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ExplainerConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().environment
    }

    pub fn log_format(&self) -> &str {
        &self.inner().log_format
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.inner().request_timeout_secs)
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.inner().http_concurrency_limit
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.inner().data_dir
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.inner().data_dir.join("snapshots")
    }

    pub fn repositories_dir(&self) -> PathBuf {
        self.inner().data_dir.join("repositories")
    }

    pub fn questions_dir(&self) -> PathBuf {
        self.inner().data_dir.join("questions")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.inner().data_dir.join("staging")
    }

    pub fn audio_dir(&self) -> &PathBuf {
        &self.inner().audio_dir
    }

    pub fn max_repository_size_bytes(&self) -> u64 {
        self.inner().max_repository_size_bytes
    }

    pub fn max_repository_files(&self) -> usize {
        self.inner().max_repository_files
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.inner().max_upload_size_bytes
    }

    pub fn ingest_timeout(&self) -> Duration {
        Duration::from_secs(self.inner().ingest_timeout_secs)
    }

    pub fn git_path(&self) -> &str {
        &self.inner().git_path
    }

    pub fn allowed_git_hosts(&self) -> Option<&[String]> {
        self.inner().allowed_git_hosts.as_deref()
    }

    pub fn gemini_api_key(&self) -> Option<&str> {
        self.inner().gemini_api_key.as_deref()
    }

    pub fn gemini_model(&self) -> &str {
        &self.inner().gemini_model
    }

    pub fn gemini_base_url(&self) -> &str {
        &self.inner().gemini_base_url
    }

    pub fn qa_max_context_bytes(&self) -> usize {
        self.inner().qa_max_context_bytes
    }

    pub fn tts_api_url(&self) -> Option<&str> {
        self.inner().tts_api_url.as_deref()
    }

    pub fn tts_api_key(&self) -> Option<&str> {
        self.inner().tts_api_key.as_deref()
    }

    pub fn tts_voice_id(&self) -> Option<&str> {
        self.inner().tts_voice_id.as_deref()
    }
}

fn is_production_name(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

fn non_empty(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl ExplainerConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        if is_production_name(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_repository_size_mb = env::var("MAX_REPOSITORY_SIZE_MB")
            .unwrap_or_else(|_| DEFAULT_MAX_REPOSITORY_SIZE_MB.to_string())
            .parse::<u64>()
            .unwrap_or(DEFAULT_MAX_REPOSITORY_SIZE_MB);

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(DEFAULT_MAX_UPLOAD_SIZE_MB);

        let allowed_git_hosts = non_empty("ALLOWED_GIT_HOSTS").map(|hosts| {
            hosts
                .split(',')
                .map(|h| h.trim().to_lowercase())
                .filter(|h| !h.is_empty())
                .collect::<Vec<_>>()
        });

        Ok(ExplainerConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| REQUEST_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(REQUEST_TIMEOUT_SECS),
            http_concurrency_limit: env::var("HTTP_CONCURRENCY_LIMIT")
                .unwrap_or_else(|_| HTTP_CONCURRENCY_LIMIT.to_string())
                .parse()
                .unwrap_or(HTTP_CONCURRENCY_LIMIT),
            data_dir: PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string())),
            audio_dir: PathBuf::from(
                env::var("AUDIO_DIR").unwrap_or_else(|_| "./audio".to_string()),
            ),
            max_repository_size_bytes: max_repository_size_mb.saturating_mul(MB),
            max_repository_files: env::var("MAX_REPOSITORY_FILES")
                .unwrap_or_else(|_| DEFAULT_MAX_REPOSITORY_FILES.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_REPOSITORY_FILES),
            max_upload_size_bytes: max_upload_size_mb.saturating_mul(MB as usize),
            ingest_timeout_secs: env::var("INGEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_INGEST_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_INGEST_TIMEOUT_SECS),
            git_path: env::var("GIT_PATH").unwrap_or_else(|_| "git".to_string()),
            allowed_git_hosts,
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            qa_max_context_bytes: env::var("QA_MAX_CONTEXT_BYTES")
                .unwrap_or_else(|_| DEFAULT_QA_MAX_CONTEXT_BYTES.to_string())
                .parse()
                .unwrap_or(DEFAULT_QA_MAX_CONTEXT_BYTES),
            tts_api_url: non_empty("TTS_API_URL"),
            tts_api_key: non_empty("TTS_API_KEY"),
            tts_voice_id: non_empty("TTS_VOICE_ID"),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_repository_size_bytes == 0 {
            return Err(anyhow::anyhow!(
                "MAX_REPOSITORY_SIZE_MB must be greater than zero"
            ));
        }

        if self.max_repository_files == 0 {
            return Err(anyhow::anyhow!(
                "MAX_REPOSITORY_FILES must be greater than zero"
            ));
        }

        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than zero"));
        }

        if self.ingest_timeout_secs == 0 {
            return Err(anyhow::anyhow!("INGEST_TIMEOUT_SECS must be greater than zero"));
        }

        if self.data_dir.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("DATA_DIR must not be empty"));
        }

        if self.tts_api_url.is_some() && self.tts_voice_id.is_none() {
            return Err(anyhow::anyhow!(
                "TTS_API_URL is set but TTS_VOICE_ID is missing"
            ));
        }

        if !matches!(self.log_format.as_str(), "compact" | "json") {
            return Err(anyhow::anyhow!("LOG_FORMAT must be 'compact' or 'json'"));
        }

        Ok(())
    }

    /// Configuration rooted at `data_dir` with defaults everywhere else. Used by tests
    /// and embedders that do not read the environment.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        ExplainerConfig {
            server_port: SERVER_PORT,
            cors_origins: vec!["http://localhost:3000".to_string()],
            environment: "development".to_string(),
            log_format: "compact".to_string(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            http_concurrency_limit: HTTP_CONCURRENCY_LIMIT,
            audio_dir: data_dir.join("audio"),
            data_dir,
            max_repository_size_bytes: DEFAULT_MAX_REPOSITORY_SIZE_MB * MB,
            max_repository_files: DEFAULT_MAX_REPOSITORY_FILES,
            max_upload_size_bytes: DEFAULT_MAX_UPLOAD_SIZE_MB * MB as usize,
            ingest_timeout_secs: DEFAULT_INGEST_TIMEOUT_SECS,
            git_path: "git".to_string(),
            allowed_git_hosts: None,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            qa_max_context_bytes: DEFAULT_QA_MAX_CONTEXT_BYTES,
            tts_api_url: None,
            tts_api_key: None,
            tts_voice_id: None,
        }
    }
}
