//! Third-party model providers.
//!
//! Answers come from an LLM behind [`AnswerProvider`]; speech from a TTS
//! service behind [`SpeechSynthesizer`].

pub mod gemini;
pub mod tts;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use explainer_core::models::AudioFormat;

pub use gemini::GeminiProvider;
pub use tts::HttpSpeechSynthesizer;

/// Text generation for question answering.
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    /// Model name recorded in logs.
    fn model_name(&self) -> &str;

    /// Raw model output for a fully rendered prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Audio returned by a [`SpeechSynthesizer`].
#[derive(Debug, Clone)]
pub struct SynthesizedSpeech {
    pub audio: Bytes,
    /// Playback length in seconds, if the provider reported one.
    pub duration_seconds: Option<f64>,
}

impl From<Bytes> for SynthesizedSpeech {
    fn from(audio: Bytes) -> Self {
        SynthesizedSpeech {
            audio,
            duration_seconds: None,
        }
    }
}

/// Text to speech.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Encoded audio in `format`.
    async fn synthesize(
        &self,
        text: &str,
        format: AudioFormat,
        voice_id: Option<&str>,
    ) -> Result<SynthesizedSpeech>;
}
