//! Speech clips: synthesize, fetch and remove

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use explainer_core::models::{AudioClip, AudioFormat};
use explainer_core::validation::validate_speech_text;
use explainer_storage::Storage;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::providers::SpeechSynthesizer;

const AUDIO_PREFIX: &str = "audio";

fn clip_key(id: Uuid, format: AudioFormat) -> String {
    format!("{}/{}.{}", AUDIO_PREFIX, id, format.extension())
}

pub struct AudioService {
    storage: Arc<dyn Storage>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
}

impl AudioService {
    pub fn new(storage: Arc<dyn Storage>, synthesizer: Option<Arc<dyn SpeechSynthesizer>>) -> Self {
        Self {
            storage,
            synthesizer,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.synthesizer.is_some()
    }

    /// Synthesize `text` and store the clip.
    #[tracing::instrument(skip(self, text), fields(format = %format, text_len = text.len()))]
    pub async fn synthesize(
        &self,
        text: &str,
        format: AudioFormat,
        voice_id: Option<&str>,
    ) -> ServiceResult<AudioClip> {
        validate_speech_text(text)?;
        let synthesizer = self
            .synthesizer
            .as_ref()
            .ok_or(ServiceError::NotConfigured("TTS_API_URL"))?;

        let start = std::time::Instant::now();
        let speech = synthesizer
            .synthesize(text, format, voice_id)
            .await
            .map_err(|e| ServiceError::Upstream(format!("speech synthesis failed: {}", e)))?;

        let duration_seconds = speech.duration_seconds.or_else(|| match format {
            AudioFormat::Wav => wav_duration_seconds(&speech.audio),
            AudioFormat::Mp3 | AudioFormat::Ogg => None,
        });
        let clip = AudioClip {
            id: Uuid::new_v4(),
            format,
            size_bytes: speech.audio.len() as u64,
            duration_seconds,
            created_at: Utc::now(),
        };
        self.storage
            .upload_with_key(&clip_key(clip.id, format), speech.audio.to_vec())
            .await?;

        tracing::info!(
            audio_id = %clip.id,
            size_bytes = clip.size_bytes,
            audio_seconds = ?clip.duration_seconds,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Audio clip stored"
        );

        Ok(clip)
    }

    async fn locate(&self, id: Uuid) -> ServiceResult<AudioFormat> {
        for format in AudioFormat::ALL {
            if self.storage.exists(&clip_key(id, format)).await? {
                return Ok(format);
            }
        }
        Err(ServiceError::NotFound(format!("audio {}", id)))
    }

    /// Stored clip bytes and their format.
    pub async fn fetch(&self, id: Uuid) -> ServiceResult<(AudioFormat, Bytes)> {
        let format = self.locate(id).await?;
        let data = self.storage.download(&clip_key(id, format)).await?;
        Ok((format, Bytes::from(data)))
    }

    /// Delete a clip. Unknown ids are `NotFound`.
    pub async fn remove(&self, id: Uuid) -> ServiceResult<()> {
        let format = self.locate(id).await?;
        self.storage.delete(&clip_key(id, format)).await?;
        tracing::info!(audio_id = %id, "Audio clip removed");
        Ok(())
    }
}

/// Length of a RIFF/WAVE clip from its `fmt ` byte rate and `data` size.
fn wav_duration_seconds(data: &[u8]) -> Option<f64> {
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return None;
    }

    let read_u32 = |at: usize| -> Option<u32> {
        data.get(at..at + 4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    };

    let mut byte_rate = None;
    let mut pos = 12;
    while pos + 8 <= data.len() {
        let id = &data[pos..pos + 4];
        let size = read_u32(pos + 4)? as usize;
        let body = pos + 8;
        match id {
            b"fmt " => byte_rate = read_u32(body + 8),
            b"data" => {
                let rate = byte_rate.filter(|r| *r > 0)?;
                // Streams written before their length is known leave the size unset
                let size = size.min(data.len() - body);
                return Some(size as f64 / rate as f64);
            }
            _ => {}
        }
        // chunks are padded to an even length
        pos = body.checked_add(size)?.checked_add(size % 2)?;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use explainer_storage::LocalStorage;
    use crate::providers::SynthesizedSpeech;

    /// Minimal PCM WAV: 8 kHz, mono, 16-bit, `samples` zero samples.
    fn wav(samples: u32) -> Vec<u8> {
        let data_len = samples * 2;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // channels
        out.extend_from_slice(&8000u32.to_le_bytes()); // sample rate
        out.extend_from_slice(&16000u32.to_le_bytes()); // byte rate
        out.extend_from_slice(&2u16.to_le_bytes()); // block align
        out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        out.resize(out.len() + data_len as usize, 0);
        out
    }

    #[test]
    fn test_wav_duration() {
        assert_eq!(wav_duration_seconds(&wav(8000)), Some(1.0));
        assert_eq!(wav_duration_seconds(&wav(4000)), Some(0.5));
        assert_eq!(wav_duration_seconds(b"ID3 not a wav"), None);
        // header cut before the data chunk
        assert_eq!(wav_duration_seconds(&wav(8000)[..30]), None);
    }

    /// Answers with a real WAV clip, and with no duration of its own.
    struct SilenceSynthesizer;

    #[async_trait]
    impl SpeechSynthesizer for SilenceSynthesizer {
        async fn synthesize(
            &self,
            _text: &str,
            format: AudioFormat,
            _voice_id: Option<&str>,
        ) -> anyhow::Result<SynthesizedSpeech> {
            let audio = match format {
                AudioFormat::Wav => Bytes::from(wav(16000)),
                _ => Bytes::from_static(b"ID3silence"),
            };
            Ok(audio.into())
        }
    }

    #[tokio::test]
    async fn test_clip_duration_from_wav_header() {
        let dir = tempfile::tempdir().unwrap();
        let audio = service(&dir, Some(Arc::new(SilenceSynthesizer))).await;

        let clip = audio.synthesize("hush", AudioFormat::Wav, None).await.unwrap();
        assert_eq!(clip.duration_seconds, Some(2.0));

        let clip = audio.synthesize("hush", AudioFormat::Mp3, None).await.unwrap();
        assert_eq!(clip.duration_seconds, None);
    }

    struct EchoSynthesizer;

    #[async_trait]
    impl SpeechSynthesizer for EchoSynthesizer {
        async fn synthesize(
            &self,
            text: &str,
            format: AudioFormat,
            _voice_id: Option<&str>,
        ) -> anyhow::Result<SynthesizedSpeech> {
            Ok(SynthesizedSpeech {
                audio: Bytes::from(format!("{}:{}", format, text)),
                duration_seconds: Some(0.25),
            })
        }
    }

    struct FailingSynthesizer;

    #[async_trait]
    impl SpeechSynthesizer for FailingSynthesizer {
        async fn synthesize(
            &self,
            _: &str,
            _: AudioFormat,
            _: Option<&str>,
        ) -> anyhow::Result<SynthesizedSpeech> {
            Err(anyhow::anyhow!("quota exhausted"))
        }
    }

    async fn service(
        dir: &tempfile::TempDir,
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    ) -> AudioService {
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        AudioService::new(Arc::new(storage), synthesizer)
    }

    #[tokio::test]
    async fn test_synthesize_fetch_remove() {
        let dir = tempfile::tempdir().unwrap();
        let audio = service(&dir, Some(Arc::new(EchoSynthesizer))).await;

        let clip = audio
            .synthesize("hello there", AudioFormat::Wav, None)
            .await
            .unwrap();
        assert!(dir
            .path()
            .join(format!("audio/{}.wav", clip.id))
            .is_file());

        // the provider's own duration wins over the container
        assert_eq!(clip.duration_seconds, Some(0.25));

        let (format, bytes) = audio.fetch(clip.id).await.unwrap();
        assert_eq!(format, AudioFormat::Wav);
        assert_eq!(&bytes[..], b"wav:hello there");

        audio.remove(clip.id).await.unwrap();
        assert!(matches!(
            audio.fetch(clip.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            audio.remove(clip.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_and_failing_synthesis() {
        let dir = tempfile::tempdir().unwrap();

        let disabled = service(&dir, None).await;
        assert!(!disabled.is_enabled());
        assert!(matches!(
            disabled.synthesize("hi", AudioFormat::Mp3, None).await,
            Err(ServiceError::NotConfigured(_))
        ));

        let failing = service(&dir, Some(Arc::new(FailingSynthesizer))).await;
        assert!(matches!(
            failing.synthesize("hi", AudioFormat::Mp3, None).await,
            Err(ServiceError::Upstream(_))
        ));

        assert!(matches!(
            failing.synthesize("   ", AudioFormat::Mp3, None).await,
            Err(ServiceError::Rejected(_))
        ));
    }
}
