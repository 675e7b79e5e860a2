use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("LiveKit token error: {0}")]
    Token(#[from] livekit_api::access_token::AccessTokenError),

    #[error("{provider} request timed out after {ms} ms")]
    Timeout { provider: &'static str, ms: u64 },

    #[error("{provider} unavailable: {message}")]
    Unavailable {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} returned an unusable response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },

    #[error("Invalid provider configuration: {0}")]
    Config(String),
}

impl ProviderError {
    pub(crate) fn unavailable(provider: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            provider,
            message: err.to_string(),
        }
    }

    pub(crate) fn invalid(provider: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider,
            message: message.into(),
        }
    }

    /// Whether retrying the same call might succeed. Configuration mistakes
    /// and malformed responses do not get better on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Unavailable { .. })
    }
}
