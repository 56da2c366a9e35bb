//! Shared HTTP client for the Explainer API.
//!
//! Provides a minimal client with generic GET/POST/DELETE helpers and domain
//! methods (ingest, catalog, questions, audio). The CLI uses this client directly.

pub mod api;

use anyhow::{Context, Result};
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// API path prefix.
pub const API_PREFIX: &str = "/api";

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// HTTP client for the Explainer API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        // Ingestion with `wait=true` can run for minutes.
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create client from environment: EXPLAINER_API_URL (or API_URL).
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("EXPLAINER_API_URL")
            .or_else(|_| std::env::var("API_URL"))
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send the request and turn non-2xx answers into errors carrying the
    /// server's `code` and message when the body is the JSON error envelope.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(anyhow::anyhow!(
            "API request failed with status {}: {}",
            status,
            describe_error(&error_text)
        ))
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut request = self.client.get(self.build_url(path));
        if !query.is_empty() {
            request = request.query(query);
        }

        self.send(request)
            .await?
            .json()
            .await
            .context("Failed to parse response as JSON")
    }

    /// GET raw bytes plus the response content type.
    pub async fn get_bytes(&self, path: &str) -> Result<(Option<String>, Bytes)> {
        let response = self.send(self.client.get(self.build_url(path))).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response
            .bytes()
            .await
            .context("Failed to read response body")?;
        Ok((content_type, body))
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<T> {
        let request = self
            .client
            .post(self.build_url(path))
            .query(query)
            .json(body);

        self.send(request)
            .await?
            .json()
            .await
            .context("Failed to parse response as JSON")
    }

    /// POST multipart form and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        form: reqwest::multipart::Form,
    ) -> Result<T> {
        let request = self
            .client
            .post(self.build_url(path))
            .query(query)
            .multipart(form);

        self.send(request)
            .await?
            .json()
            .await
            .context("Failed to parse response as JSON")
    }

    /// DELETE request and deserialize response.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.client.delete(self.build_url(path)))
            .await?
            .json()
            .await
            .context("Failed to parse response as JSON")
    }
}

/// `"{code}: {error}"` from the API error envelope, or the raw text.
fn describe_error(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => match (json["code"].as_str(), json["error"].as_str()) {
            (Some(code), Some(error)) => format!("{}: {}", code, error),
            _ => body.to_string(),
        },
        Err(_) => body.to_string(),
    }
}

// Re-export domain response types for convenience.
pub use api::{CreateOptions, DeleteAudioResponse, DeleteRepositoryResponse, RepositorySource};
pub use explainer_core::models::{
    AudioFormat, CatalogResponse, CodeExplanation, ExplainCodeResponse, FileEntry, QuestionRecord,
    Repository, SynthesizeResponse,
};
