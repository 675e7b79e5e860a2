use serde::{Deserialize, Serialize};
use std::fmt;

fn default_token_ttl_seconds() -> u64 {
    3600
}

/// LiveKit credentials and token policy for call rooms.
#[derive(Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing)]
    pub api_secret: String,
    /// JWT TTL in seconds for room join tokens. Default: 3600 (1 hour).
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            token_ttl_seconds: default_token_ttl_seconds(),
        }
    }
}

impl fmt::Debug for RoomConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .finish()
    }
}

fn default_stt_model() -> String {
    "nova-2-general".to_string()
}

fn default_stt_language() -> String {
    "en".to_string()
}

fn default_stt_base_url() -> String {
    "https://api.deepgram.com/v1".to_string()
}

fn default_stt_deadline_ms() -> u64 {
    10_000
}

/// Deepgram speech-to-text settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct SttConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_stt_model")]
    pub model: String,
    #[serde(default = "default_stt_language")]
    pub language: String,
    #[serde(default = "default_stt_base_url")]
    pub base_url: String,
    /// Per-request deadline in milliseconds.
    #[serde(default = "default_stt_deadline_ms")]
    pub deadline_ms: u64,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_stt_model(),
            language: default_stt_language(),
            base_url: default_stt_base_url(),
            deadline_ms: default_stt_deadline_ms(),
        }
    }
}

impl fmt::Debug for SttConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SttConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("language", &self.language)
            .field("base_url", &self.base_url)
            .field("deadline_ms", &self.deadline_ms)
            .finish()
    }
}

fn default_tts_model() -> String {
    "sonic-2".to_string()
}

fn default_tts_voice_id() -> String {
    "5345cf08-6f37-424d-a5d9-8ae1101b9377".to_string()
}

fn default_tts_base_url() -> String {
    "https://api.cartesia.ai".to_string()
}

fn default_tts_sample_rate() -> u32 {
    22_050
}

fn default_tts_deadline_ms() -> u64 {
    10_000
}

/// Cartesia text-to-speech settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_tts_model")]
    pub model: String,
    #[serde(default = "default_tts_voice_id")]
    pub voice_id: String,
    #[serde(default = "default_tts_base_url")]
    pub base_url: String,
    /// PCM sample rate requested from the synthesis endpoint.
    #[serde(default = "default_tts_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_tts_deadline_ms")]
    pub deadline_ms: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_tts_model(),
            voice_id: default_tts_voice_id(),
            base_url: default_tts_base_url(),
            sample_rate: default_tts_sample_rate(),
            deadline_ms: default_tts_deadline_ms(),
        }
    }
}

impl fmt::Debug for TtsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtsConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("voice_id", &self.voice_id)
            .field("base_url", &self.base_url)
            .field("sample_rate", &self.sample_rate)
            .field("deadline_ms", &self.deadline_ms)
            .finish()
    }
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_temperature() -> f64 {
    0.3
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_deadline_ms() -> u64 {
    15_000
}

/// OpenAI-compatible language model settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_temperature")]
    pub temperature: f64,
    #[serde(default)]
    pub max_tokens: Option<u64>,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_deadline_ms")]
    pub deadline_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_llm_model(),
            temperature: default_llm_temperature(),
            max_tokens: None,
            base_url: default_llm_base_url(),
            deadline_ms: default_llm_deadline_ms(),
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("base_url", &self.base_url)
            .field("deadline_ms", &self.deadline_ms)
            .finish()
    }
}

fn default_avatar_base_url() -> String {
    "https://api.bey.dev/v1".to_string()
}

fn default_avatar_deadline_ms() -> u64 {
    30_000
}

/// Beyond Presence avatar settings. The avatar is optional; sessions run
/// audio-only when it is unconfigured.
#[derive(Clone, Serialize, Deserialize)]
pub struct AvatarConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default)]
    pub avatar_id: String,
    #[serde(default = "default_avatar_base_url")]
    pub base_url: String,
    /// How long to wait for the avatar to come up before giving up and
    /// continuing audio-only.
    #[serde(default = "default_avatar_deadline_ms")]
    pub deadline_ms: u64,
}

impl AvatarConfig {
    /// Avatar rendering is enabled only when both credentials are present.
    pub fn is_enabled(&self) -> bool {
        !self.api_key.is_empty() && !self.avatar_id.is_empty()
    }
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            avatar_id: String::new(),
            base_url: default_avatar_base_url(),
            deadline_ms: default_avatar_deadline_ms(),
        }
    }
}

impl fmt::Debug for AvatarConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarConfig")
            .field("api_key", &"[REDACTED]")
            .field("avatar_id", &self.avatar_id)
            .field("base_url", &self.base_url)
            .field("deadline_ms", &self.deadline_ms)
            .finish()
    }
}
