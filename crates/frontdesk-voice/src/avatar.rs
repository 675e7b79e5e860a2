use crate::config::AvatarConfig;
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

const PROVIDER: &str = "beyond-presence";

/// Receipt for one rendered avatar utterance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvatarRender {
    /// Seconds of avatar video produced. Feeds per-call cost accounting.
    pub video_seconds: f64,
}

/// Rough speech length for text when the provider does not report one
/// (about 15 characters per spoken second).
pub(crate) fn estimate_speech_seconds(text: &str) -> f64 {
    text.chars().count() as f64 / 15.0
}

/// Drives a video avatar that lip-syncs the assistant's replies.
///
/// Warm-up runs concurrently with the first conversation turns; callers
/// check [`AvatarRenderer::is_ready`] before each reply and skip rendering
/// until the avatar is up. A session that never becomes ready stays
/// audio-only.
#[async_trait]
pub trait AvatarRenderer: Send + Sync {
    /// Starts an avatar session bound to the given room.
    async fn warm_up(&self, room_name: &str) -> Result<(), ProviderError>;

    /// Whether warm-up has completed.
    fn is_ready(&self) -> bool;

    /// Renders one reply. Fails if the avatar is not ready.
    async fn speak(&self, text: &str) -> Result<AvatarRender, ProviderError>;
}

/// Beyond Presence avatar client.
#[derive(Debug)]
pub struct BeyondPresenceAvatar {
    http: reqwest::Client,
    config: AvatarConfig,
    session_id: Mutex<Option<String>>,
}

impl BeyondPresenceAvatar {
    pub fn new(http: reqwest::Client, config: AvatarConfig) -> Self {
        Self {
            http,
            config,
            session_id: Mutex::new(None),
        }
    }

    fn current_session(&self) -> Option<String> {
        self.session_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Debug, Deserialize)]
struct SessionCreated {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct SpeakReceipt {
    #[serde(default)]
    duration_seconds: f64,
}

#[async_trait]
impl AvatarRenderer for BeyondPresenceAvatar {
    async fn warm_up(&self, room_name: &str) -> Result<(), ProviderError> {
        if !self.config.is_enabled() {
            return Err(ProviderError::Config(
                "avatar credentials are not configured".to_string(),
            ));
        }

        let url = format!("{}/sessions", self.config.base_url);
        let request = self
            .http
            .post(&url)
            .header("X-API-Key", &self.config.api_key)
            .json(&serde_json::json!({
                "avatar_id": self.config.avatar_id,
                "livekit_room": room_name,
            }))
            .send();

        let response = tokio::time::timeout(Duration::from_millis(self.config.deadline_ms), request)
            .await
            .map_err(|_| ProviderError::Timeout {
                provider: PROVIDER,
                ms: self.config.deadline_ms,
            })?
            .map_err(|e| {
                tracing::error!(error = %e, "avatar session request failed");
                ProviderError::unavailable(PROVIDER, e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body, "avatar session creation rejected");
            return Err(ProviderError::unavailable(
                PROVIDER,
                format!("status {status}"),
            ));
        }

        let created: SessionCreated = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to deserialize avatar session response");
            ProviderError::invalid(PROVIDER, e.to_string())
        })?;

        tracing::info!(session = created.id, room = room_name, "avatar session ready");
        *self
            .session_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(created.id);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.current_session().is_some()
    }

    async fn speak(&self, text: &str) -> Result<AvatarRender, ProviderError> {
        let session = self.current_session().ok_or_else(|| {
            ProviderError::unavailable(PROVIDER, "avatar session is not started")
        })?;

        let url = format!("{}/sessions/{}/speak", self.config.base_url, session);
        let request = self
            .http
            .post(&url)
            .header("X-API-Key", &self.config.api_key)
            .json(&serde_json::json!({ "text": text }))
            .send();

        let response = tokio::time::timeout(Duration::from_millis(self.config.deadline_ms), request)
            .await
            .map_err(|_| ProviderError::Timeout {
                provider: PROVIDER,
                ms: self.config.deadline_ms,
            })?
            .map_err(|e| {
                tracing::error!(error = %e, "avatar speak request failed");
                ProviderError::unavailable(PROVIDER, e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body, "avatar speak rejected");
            return Err(ProviderError::unavailable(
                PROVIDER,
                format!("status {status}"),
            ));
        }

        let receipt: SpeakReceipt = response.json().await.unwrap_or_default();
        let video_seconds = if receipt.duration_seconds > 0.0 {
            receipt.duration_seconds
        } else {
            estimate_speech_seconds(text)
        };

        Ok(AvatarRender { video_seconds })
    }
}
