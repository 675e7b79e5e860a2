//! Provider integrations for the frontdesk voice platform.
//!
//! Sessions talk to four external services, each behind a trait so the
//! session loop never knows which vendor is on the other side:
//!
//! - [`SpeechToText`] — caller audio in, transcript out (Deepgram).
//! - [`TextToSpeech`] — reply text in, speech audio out (Cartesia).
//! - [`LanguageModel`] — conversation in, reply or tool calls out (OpenAI).
//! - [`AvatarRenderer`] — reply text in, rendered video out (Beyond
//!   Presence), optional.
//!
//! [`RoomService`] mints LiveKit room names and join tokens; rooms are
//! created lazily by LiveKit when the first participant joins, so no
//! server-side room API call is needed. The [`scripted`] module provides
//! deterministic in-process implementations of every trait for driving
//! session logic in tests without network access.

pub mod avatar;
pub mod config;
pub mod error;
pub mod llm;
pub mod rooms;
pub mod scripted;
pub mod stt;
pub mod transport;
pub mod tts;

pub use avatar::{AvatarRender, AvatarRenderer, BeyondPresenceAvatar};
pub use config::{AvatarConfig, LlmConfig, RoomConfig, SttConfig, TtsConfig};
pub use error::ProviderError;
pub use llm::{
    ChatMessage, LanguageModel, LlmReply, OpenAiLlm, TokenUsage, ToolCallRequest, ToolSchema,
};
pub use rooms::RoomService;
pub use stt::{DeepgramStt, SpeechToText, TranscriptSegment};
pub use transport::CallTransport;
pub use tts::{CartesiaTts, SpeechAudio, TextToSpeech};
