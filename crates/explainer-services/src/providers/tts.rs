//! JSON-over-HTTP text to speech client

use anyhow::{Context, Result};
use async_trait::async_trait;
use explainer_core::models::AudioFormat;
use serde::Serialize;
use std::time::Duration;

use super::{SpeechSynthesizer, SynthesizedSpeech};

/// Response header carrying the clip length in seconds, when the service sends it.
const DURATION_HEADER: &str = "x-audio-duration";

/// Posts `{text, format, voice_id}` to a TTS endpoint and expects the encoded
/// audio as the response body, with its length in an optional
/// `X-Audio-Duration` header.
pub struct HttpSpeechSynthesizer {
    http_client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    default_voice: Option<String>,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    format: AudioFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice_id: Option<&'a str>,
}

impl HttpSpeechSynthesizer {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        default_voice: Option<String>,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client for speech synthesis")?;

        Ok(Self {
            http_client,
            url: url.into(),
            api_key,
            default_voice,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        format: AudioFormat,
        voice_id: Option<&str>,
    ) -> Result<SynthesizedSpeech> {
        let body = SpeechRequest {
            text,
            format,
            voice_id: voice_id.or(self.default_voice.as_deref()),
        };

        let mut request = self
            .http_client
            .post(&self.url)
            .header("accept", format.content_type())
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .context("Failed to send request to speech API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "Speech API request failed: {} - {}",
                status,
                error_text
            ));
        }

        let duration_seconds = response
            .headers()
            .get(DURATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_duration);

        let audio = response
            .bytes()
            .await
            .context("Failed to read speech API response")?;
        if audio.is_empty() {
            return Err(anyhow::anyhow!("Speech API returned an empty body"));
        }

        Ok(SynthesizedSpeech {
            audio,
            duration_seconds,
        })
    }
}

fn parse_duration(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
}
