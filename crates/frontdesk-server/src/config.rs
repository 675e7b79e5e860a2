//! Server configuration loading from file and environment variables.

use frontdesk_types::{BusinessHours, RateCard};
use frontdesk_voice::{AvatarConfig, LlmConfig, RoomConfig, SttConfig, TtsConfig};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// LiveKit room credentials and token policy.
    #[serde(default)]
    pub room: RoomConfig,

    /// Speech-to-text provider settings.
    #[serde(default)]
    pub stt: SttConfig,

    /// Text-to-speech provider settings.
    #[serde(default)]
    pub tts: TtsConfig,

    /// Language model provider settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Avatar provider settings (optional; audio-only when unset).
    #[serde(default)]
    pub avatar: AvatarConfig,

    /// Bookable hours policy.
    #[serde(default)]
    pub hours: BusinessHours,

    /// Provider price card for per-call cost estimates.
    #[serde(default)]
    pub rates: RateCard,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request deadline in seconds; requests past it get a 408.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Allowed CORS origin. `*` allows any origin.
    #[serde(default = "default_cors_allow_origin")]
    pub cors_allow_origin: String,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Maximum number of pooled SQLite connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,

    /// SQLite busy timeout in milliseconds. Booking transactions run in
    /// immediate mode, so concurrent writers queue on this.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "frontdesk_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_cors_allow_origin() -> String {
    "*".to_string()
}

fn default_db_path() -> String {
    "frontdesk.db".to_string()
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout_seconds(),
            cors_allow_origin: default_cors_allow_origin(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            pool_max_size: default_pool_max_size(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `FRONTDESK_HOST` overrides `server.host`
/// - `FRONTDESK_PORT` overrides `server.port`
/// - `FRONTDESK_DB_PATH` overrides `database.path`
/// - `FRONTDESK_LOG_LEVEL` overrides `logging.level`
/// - `FRONTDESK_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `FRONTDESK_LIVEKIT_URL` / `FRONTDESK_LIVEKIT_API_KEY` /
///   `FRONTDESK_LIVEKIT_API_SECRET` override the `[room]` credentials
/// - `FRONTDESK_DEEPGRAM_API_KEY` overrides `stt.api_key`
/// - `FRONTDESK_CARTESIA_API_KEY` overrides `tts.api_key`
/// - `FRONTDESK_OPENAI_API_KEY` overrides `llm.api_key`
/// - `FRONTDESK_BEY_API_KEY` overrides `avatar.api_key`
///
/// Secrets belong in the environment; the TOML file can hold everything
/// else and still parse with the key fields left out.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("FRONTDESK_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("FRONTDESK_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(db_path) = std::env::var("FRONTDESK_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(level) = std::env::var("FRONTDESK_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("FRONTDESK_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(url) = std::env::var("FRONTDESK_LIVEKIT_URL") {
        config.room.url = url;
    }
    if let Ok(key) = std::env::var("FRONTDESK_LIVEKIT_API_KEY") {
        config.room.api_key = key;
    }
    if let Ok(secret) = std::env::var("FRONTDESK_LIVEKIT_API_SECRET") {
        config.room.api_secret = secret;
    }
    if let Ok(key) = std::env::var("FRONTDESK_DEEPGRAM_API_KEY") {
        config.stt.api_key = key;
    }
    if let Ok(key) = std::env::var("FRONTDESK_CARTESIA_API_KEY") {
        config.tts.api_key = key;
    }
    if let Ok(key) = std::env::var("FRONTDESK_OPENAI_API_KEY") {
        config.llm.api_key = key;
    }
    if let Ok(key) = std::env::var("FRONTDESK_BEY_API_KEY") {
        config.avatar.api_key = key;
    }

    Ok(config)
}
