//! Deterministic in-process providers for driving session logic without
//! network access.
//!
//! These mirror the real provider contracts closely enough to exercise the
//! full session loop: the scripted transcriber echoes utterance bytes back
//! as text, the scripted synthesizer returns the text itself as "audio",
//! and the scripted model replays a queue of prepared replies. Tests feed
//! caller turns through a [`ChannelTransport`] and inspect what got played
//! back.

use crate::avatar::{estimate_speech_seconds, AvatarRender, AvatarRenderer};
use crate::error::ProviderError;
use crate::llm::{ChatMessage, LanguageModel, LlmReply, TokenUsage, ToolCallRequest, ToolSchema};
use crate::stt::{SpeechToText, TranscriptSegment};
use crate::transport::CallTransport;
use crate::tts::{SpeechAudio, TextToSpeech};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Transcriber that interprets utterance bytes as UTF-8 text.
#[derive(Debug, Default)]
pub struct ScriptedStt {
    failures: Mutex<VecDeque<ProviderError>>,
}

impl ScriptedStt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a failure returned by the next `transcribe` call.
    pub fn push_failure(&self, err: ProviderError) {
        lock(&self.failures).push_back(err);
    }
}

#[async_trait]
impl SpeechToText for ScriptedStt {
    async fn transcribe(&self, audio: &[u8]) -> Result<TranscriptSegment, ProviderError> {
        if let Some(err) = lock(&self.failures).pop_front() {
            return Err(err);
        }
        let text = String::from_utf8_lossy(audio).trim().to_string();
        Ok(TranscriptSegment {
            audio_seconds: estimate_speech_seconds(&text),
            text,
        })
    }
}

/// Synthesizer that returns the reply text itself as audio bytes.
#[derive(Debug, Default)]
pub struct ScriptedTts {
    failures: Mutex<VecDeque<ProviderError>>,
}

impl ScriptedTts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_failure(&self, err: ProviderError) {
        lock(&self.failures).push_back(err);
    }
}

#[async_trait]
impl TextToSpeech for ScriptedTts {
    async fn synthesize(&self, text: &str) -> Result<SpeechAudio, ProviderError> {
        if let Some(err) = lock(&self.failures).pop_front() {
            return Err(err);
        }
        Ok(SpeechAudio {
            audio: text.as_bytes().to_vec(),
            characters: text.chars().count() as u64,
        })
    }
}

/// Model that replays a prepared queue of replies and records every request
/// it receives.
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<LlmReply, ProviderError>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a scripted reply.
    pub fn push_reply(&self, reply: LlmReply) {
        lock(&self.replies).push_back(Ok(reply));
    }

    /// Queues a scripted failure.
    pub fn push_failure(&self, err: ProviderError) {
        lock(&self.replies).push_back(Err(err));
    }

    /// Builds a direct spoken reply with fixed token usage.
    pub fn say(text: impl Into<String>) -> LlmReply {
        LlmReply {
            content: Some(text.into()),
            tool_calls: Vec::new(),
            usage: TokenUsage {
                prompt_tokens: 50,
                completion_tokens: 10,
            },
        }
    }

    /// Builds a reply requesting a single tool call.
    pub fn call_tool(name: impl Into<String>, arguments: serde_json::Value) -> LlmReply {
        let name = name.into();
        LlmReply {
            content: None,
            tool_calls: vec![ToolCallRequest {
                id: format!("call-{name}"),
                name,
                arguments,
            }],
            usage: TokenUsage {
                prompt_tokens: 50,
                completion_tokens: 10,
            },
        }
    }

    /// Every request `complete` has received, oldest first.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolSchema],
    ) -> Result<LlmReply, ProviderError> {
        lock(&self.requests).push(messages.to_vec());
        lock(&self.replies).pop_front().unwrap_or_else(|| {
            Err(ProviderError::Unavailable {
                provider: "scripted-llm",
                message: "reply script exhausted".to_string(),
            })
        })
    }
}

/// Avatar that records what it was asked to speak.
#[derive(Debug, Default)]
pub struct ScriptedAvatar {
    ready: AtomicBool,
    fail_warm_up: AtomicBool,
    spoken: Mutex<Vec<String>>,
}

impl ScriptedAvatar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `warm_up` call fail, leaving the avatar unready.
    pub fn fail_warm_up(&self) {
        self.fail_warm_up.store(true, Ordering::SeqCst);
    }

    /// Everything the avatar has spoken, in order.
    pub fn spoken(&self) -> Vec<String> {
        lock(&self.spoken).clone()
    }
}

#[async_trait]
impl AvatarRenderer for ScriptedAvatar {
    async fn warm_up(&self, _room_name: &str) -> Result<(), ProviderError> {
        if self.fail_warm_up.swap(false, Ordering::SeqCst) {
            return Err(ProviderError::Unavailable {
                provider: "scripted-avatar",
                message: "warm-up scripted to fail".to_string(),
            });
        }
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn speak(&self, text: &str) -> Result<AvatarRender, ProviderError> {
        if !self.is_ready() {
            return Err(ProviderError::Unavailable {
                provider: "scripted-avatar",
                message: "avatar is not ready".to_string(),
            });
        }
        lock(&self.spoken).push(text.to_string());
        Ok(AvatarRender {
            video_seconds: estimate_speech_seconds(text),
        })
    }
}

/// Test side of a [`ChannelTransport`]: feed utterances in, observe played
/// audio out.
#[derive(Debug)]
pub struct CallerHandle {
    pub utterances: mpsc::Sender<Vec<u8>>,
    pub played: mpsc::UnboundedReceiver<SpeechAudio>,
    severed: Arc<AtomicBool>,
}

impl CallerHandle {
    /// Says one utterance as UTF-8 text.
    pub async fn say(&self, text: &str) {
        self.utterances
            .send(text.as_bytes().to_vec())
            .await
            .expect("transport should accept the utterance");
    }

    /// Simulates the media link failing (as opposed to a clean hang-up).
    pub fn sever(&self) {
        self.severed.store(true, Ordering::SeqCst);
    }
}

/// In-process transport over channels. Dropping the [`CallerHandle`]'s
/// sender is a clean hang-up.
#[derive(Debug)]
pub struct ChannelTransport {
    incoming: mpsc::Receiver<Vec<u8>>,
    played: mpsc::UnboundedSender<SpeechAudio>,
    severed: Arc<AtomicBool>,
}

/// Creates a connected transport/handle pair.
pub fn channel_transport() -> (ChannelTransport, CallerHandle) {
    let (utterance_tx, utterance_rx) = mpsc::channel(16);
    let (played_tx, played_rx) = mpsc::unbounded_channel();
    let severed = Arc::new(AtomicBool::new(false));

    let transport = ChannelTransport {
        incoming: utterance_rx,
        played: played_tx,
        severed: Arc::clone(&severed),
    };
    let handle = CallerHandle {
        utterances: utterance_tx,
        played: played_rx,
        severed,
    };
    (transport, handle)
}

#[async_trait]
impl CallTransport for ChannelTransport {
    async fn next_utterance(&mut self) -> Result<Option<Vec<u8>>, ProviderError> {
        if self.severed.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable {
                provider: "channel-transport",
                message: "media link severed".to_string(),
            });
        }
        Ok(self.incoming.recv().await)
    }

    async fn play(&mut self, audio: &SpeechAudio) -> Result<(), ProviderError> {
        if self.severed.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable {
                provider: "channel-transport",
                message: "media link severed".to_string(),
            });
        }
        // A disinterested listener is not an error.
        let _ = self.played.send(audio.clone());
        Ok(())
    }
}
