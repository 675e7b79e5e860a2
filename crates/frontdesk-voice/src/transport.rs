use crate::error::ProviderError;
use crate::tts::SpeechAudio;
use async_trait::async_trait;

/// Bidirectional audio link to the caller for one session.
///
/// One utterance is one complete caller turn, already endpointed by the
/// transport. `next_utterance` resolves with `None` when the caller hangs
/// up; an `Err` means the link itself failed mid-call and the session
/// cannot continue.
#[async_trait]
pub trait CallTransport: Send + Sync {
    async fn next_utterance(&mut self) -> Result<Option<Vec<u8>>, ProviderError>;

    async fn play(&mut self, audio: &SpeechAudio) -> Result<(), ProviderError>;
}
