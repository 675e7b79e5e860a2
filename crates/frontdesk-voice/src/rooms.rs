use crate::config::RoomConfig;
use crate::error::ProviderError;
use livekit_api::access_token::{AccessToken, VideoGrants};
use std::time::Duration;
use uuid::Uuid;

/// Mints room names and join tokens for call sessions.
///
/// LiveKit creates a room lazily when the first participant joins with a
/// valid token, so no server-side room API call happens here. Each session
/// gets its own room.
#[derive(Debug)]
pub struct RoomService {
    config: RoomConfig,
}

impl RoomService {
    pub fn new(config: RoomConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        !self.config.url.is_empty()
    }

    /// Returns the browser-facing LiveKit URL.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Generates a fresh room name for one call session.
    pub fn allocate_room_name(&self) -> String {
        format!("voice-room-{}", &Uuid::new_v4().simple().to_string()[..8])
    }

    /// Mints a join token for a participant in the given room.
    pub fn generate_join_token(
        &self,
        room_name: &str,
        participant_identity: &str,
        participant_name: &str,
    ) -> Result<String, ProviderError> {
        let token = AccessToken::with_api_key(&self.config.api_key, &self.config.api_secret)
            .with_identity(participant_identity)
            .with_name(participant_name)
            .with_grants(VideoGrants {
                room_join: true,
                room: room_name.to_string(),
                can_publish: true,
                can_subscribe: true,
                can_publish_data: true,
                ..Default::default()
            })
            .with_ttl(Duration::from_secs(self.config.token_ttl_seconds));

        token.to_jwt().map_err(ProviderError::Token)
    }
}
