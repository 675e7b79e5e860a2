use crate::config::TtsConfig;
use crate::error::ProviderError;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Maximum text input size for TTS (64 KiB). Prevents resource exhaustion
/// from oversized synthesis requests.
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

const PROVIDER: &str = "cartesia";

/// Synthesized speech ready for playback.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechAudio {
    /// Raw PCM audio (s16le at the configured sample rate).
    pub audio: Vec<u8>,
    /// Number of characters synthesized. Feeds per-call cost accounting.
    pub characters: u64,
}

/// Converts reply text to speech audio.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<SpeechAudio, ProviderError>;
}

/// Cartesia synthesis client (bytes endpoint, non-streaming).
#[derive(Debug, Clone)]
pub struct CartesiaTts {
    http: reqwest::Client,
    config: TtsConfig,
}

impl CartesiaTts {
    pub fn new(http: reqwest::Client, config: TtsConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl TextToSpeech for CartesiaTts {
    async fn synthesize(&self, text: &str) -> Result<SpeechAudio, ProviderError> {
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(ProviderError::invalid(
                PROVIDER,
                format!(
                    "text exceeds maximum size: {} bytes (limit: {} bytes)",
                    text.len(),
                    MAX_TTS_INPUT_BYTES
                ),
            ));
        }

        let url = format!("{}/tts/bytes", self.config.base_url);
        let body = json!({
            "model_id": self.config.model,
            "transcript": text,
            "voice": { "mode": "id", "id": self.config.voice_id },
            "language": "en",
            "output_format": {
                "container": "raw",
                "encoding": "pcm_s16le",
                "sample_rate": self.config.sample_rate,
            },
        });

        let request = self
            .http
            .post(&url)
            .header("X-API-Key", &self.config.api_key)
            .header("Cartesia-Version", "2024-06-10")
            .json(&body)
            .send();

        let response = tokio::time::timeout(Duration::from_millis(self.config.deadline_ms), request)
            .await
            .map_err(|_| ProviderError::Timeout {
                provider: PROVIDER,
                ms: self.config.deadline_ms,
            })?
            .map_err(|e| {
                tracing::error!(error = %e, "cartesia request failed");
                ProviderError::unavailable(PROVIDER, e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body, "cartesia returned an error");
            return Err(ProviderError::unavailable(
                PROVIDER,
                format!("status {status}"),
            ));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "failed to read cartesia audio body");
                ProviderError::unavailable(PROVIDER, e)
            })?
            .to_vec();

        if audio.is_empty() {
            return Err(ProviderError::invalid(PROVIDER, "empty audio body"));
        }

        Ok(SpeechAudio {
            audio,
            characters: text.chars().count() as u64,
        })
    }
}
