use frontdesk_voice::ProviderError;
use thiserror::Error;

/// Failures that abort the turn loop.
///
/// Ledger-level domain errors never surface here — the tool dispatcher turns
/// them into spoken replies. What remains is a provider that stayed down
/// after its retry, or an audio link that died mid-call.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A capability provider failed and the bounded retry did not recover it.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The audio transport to the caller is gone. Fatal, no retry.
    #[error("call transport lost")]
    TransportLost,
}
