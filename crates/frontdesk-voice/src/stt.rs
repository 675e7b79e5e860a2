use crate::config::SttConfig;
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Maximum audio input size for STT (10 MiB). Prevents oversized uploads.
const MAX_STT_INPUT_BYTES: usize = 10 * 1024 * 1024;

const PROVIDER: &str = "deepgram";

/// One transcribed caller utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub text: String,
    /// Duration of the source audio in seconds, as reported by the
    /// transcription service. Feeds per-call cost accounting.
    pub audio_seconds: f64,
}

/// Converts caller audio to text.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<TranscriptSegment, ProviderError>;
}

/// Deepgram pre-recorded transcription client.
#[derive(Debug, Clone)]
pub struct DeepgramStt {
    http: reqwest::Client,
    config: SttConfig,
}

impl DeepgramStt {
    pub fn new(http: reqwest::Client, config: SttConfig) -> Self {
        Self { http, config }
    }
}

#[derive(Debug, Deserialize)]
struct DeepgramResponse {
    #[serde(default)]
    metadata: DeepgramMetadata,
    #[serde(default)]
    results: DeepgramResults,
}

#[derive(Debug, Default, Deserialize)]
struct DeepgramMetadata {
    #[serde(default)]
    duration: f64,
}

#[derive(Debug, Default, Deserialize)]
struct DeepgramResults {
    #[serde(default)]
    channels: Vec<DeepgramChannel>,
}

#[derive(Debug, Deserialize)]
struct DeepgramChannel {
    #[serde(default)]
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(Debug, Deserialize)]
struct DeepgramAlternative {
    #[serde(default)]
    transcript: String,
}

#[async_trait]
impl SpeechToText for DeepgramStt {
    async fn transcribe(&self, audio: &[u8]) -> Result<TranscriptSegment, ProviderError> {
        if audio.len() > MAX_STT_INPUT_BYTES {
            return Err(ProviderError::invalid(
                PROVIDER,
                format!(
                    "audio exceeds maximum size: {} bytes (limit: {} bytes)",
                    audio.len(),
                    MAX_STT_INPUT_BYTES
                ),
            ));
        }

        let url = format!("{}/listen", self.config.base_url);
        let request = self
            .http
            .post(&url)
            .query(&[
                ("model", self.config.model.as_str()),
                ("language", self.config.language.as_str()),
                ("smart_format", "true"),
                ("punctuate", "true"),
            ])
            .header("Authorization", format!("Token {}", self.config.api_key))
            .header("Content-Type", "audio/wav")
            .body(audio.to_vec())
            .send();

        let response = tokio::time::timeout(Duration::from_millis(self.config.deadline_ms), request)
            .await
            .map_err(|_| ProviderError::Timeout {
                provider: PROVIDER,
                ms: self.config.deadline_ms,
            })?
            .map_err(|e| {
                tracing::error!(error = %e, "deepgram request failed");
                ProviderError::unavailable(PROVIDER, e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body, "deepgram returned an error");
            return Err(ProviderError::unavailable(
                PROVIDER,
                format!("status {status}"),
            ));
        }

        let parsed: DeepgramResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to deserialize deepgram response");
            ProviderError::invalid(PROVIDER, e.to_string())
        })?;

        let transcript = parsed
            .results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.trim().to_string())
            .ok_or_else(|| ProviderError::invalid(PROVIDER, "no transcription alternatives"))?;

        Ok(TranscriptSegment {
            text: transcript,
            audio_seconds: parsed.metadata.duration,
        })
    }
}
