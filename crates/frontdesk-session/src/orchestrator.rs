//! The per-call session loop.
//!
//! One [`CallSession`] owns the transport for one caller and drives the
//! whole conversation: listen, transcribe, reason, run tools, speak. The
//! loop exits on farewell, hang-up, operator cancel, or a failure that
//! retry could not absorb, and every exit path funnels through [`finish`]
//! so exactly one summary gets generated and recorded per session.
//!
//! [`finish`]: CallSession::finish

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use frontdesk_ledger::{Ledger, LedgerError};
use frontdesk_types::{BusinessHours, RateCard, Role, Turn};
use frontdesk_voice::{
    AvatarRenderer, CallTransport, ChatMessage, LanguageModel, LlmReply, SpeechAudio,
    SpeechToText, TextToSpeech, ToolSchema, TranscriptSegment,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::context::SessionContext;
use crate::costs::{CostAccountant, CostEstimate};
use crate::error::SessionError;
use crate::registry::SessionHandle;
use crate::summary::SummaryGenerator;
use crate::tools::{tool_schemas, ToolDispatcher};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

const GREETING: &str = "Hi there! How can I help you today?";

const FALLBACK_REPLY: &str =
    "I'm sorry, I lost my train of thought. Could you say that once more?";

const APOLOGY: &str = "I'm so sorry, I'm having technical trouble on my end. \
     Please call back in a few minutes.";

const RETRY_DELAY: Duration = Duration::from_millis(200);

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Connecting,
    Listening,
    Reasoning,
    ToolExecuting,
    Responding,
    Ended,
    Error,
}

impl SessionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Listening => "listening",
            Self::Reasoning => "reasoning",
            Self::ToolExecuting => "tool_executing",
            Self::Responding => "responding",
            Self::Ended => "ended",
            Self::Error => "error",
        }
    }
}

/// The provider set one session talks to.
#[derive(Clone)]
pub struct SessionProviders {
    pub stt: Arc<dyn SpeechToText>,
    pub tts: Arc<dyn TextToSpeech>,
    pub llm: Arc<dyn LanguageModel>,
    /// Optional video layer; the session runs fine without one.
    pub avatar: Option<Arc<dyn AvatarRenderer>>,
}

/// How a session came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallEnd {
    /// The model wrapped up with `end_conversation`.
    Farewell,
    /// The caller hung up cleanly.
    HangUp,
    /// An operator ended the session through the API.
    Cancelled,
    /// The media link failed mid-call.
    TransportLost,
    /// A provider kept failing after retry.
    ProviderFailure,
}

/// What one finished session amounted to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub session_id: Uuid,
    pub end: CallEnd,
    /// Transcript turns recorded, all roles included.
    pub turns: usize,
    /// Whether the summary row was written.
    pub summary_recorded: bool,
    pub cost: CostEstimate,
}

enum TurnFlow {
    Continue,
    Farewell,
}

fn system_prompt(hours: &BusinessHours) -> String {
    format!(
        "You are Echo, the friendly front-desk receptionist on a live phone call. \
         Keep replies short and speakable: one or two sentences, no lists, no markdown. \
         Today is {today}. Office hours are {hours}; the availability tool knows which \
         days are open. Identify callers by phone number before booking anything, and \
         ask new callers for their name so you can create an account. Use the tools for \
         every factual claim about the calendar; never guess. Tool results may include \
         ids. Use them in later tool calls and never read them aloud. When the caller \
         is done, say goodbye and then call end_conversation.",
        today = Utc::now().format("%A, %B %-d, %Y"),
        hours = hours.describe(),
    )
}

/// One live call, owning its transport and driving the whole loop.
pub struct CallSession {
    session_id: Uuid,
    room_name: String,
    transport: Box<dyn CallTransport>,
    providers: SessionProviders,
    dispatcher: ToolDispatcher,
    summaries: SummaryGenerator,
    ledger: Ledger,
    hours: BusinessHours,
    rates: RateCard,
    tools: Vec<ToolSchema>,
    cancel: CancellationToken,
    phase: Arc<Mutex<SessionPhase>>,
    costs: Arc<Mutex<CostAccountant>>,
    context: SessionContext,
    messages: Vec<ChatMessage>,
}

impl CallSession {
    pub fn new(
        session_id: Uuid,
        room_name: String,
        transport: Box<dyn CallTransport>,
        providers: SessionProviders,
        ledger: Ledger,
        hours: BusinessHours,
        rates: RateCard,
    ) -> Self {
        let summaries = SummaryGenerator::new(providers.llm.clone());
        let dispatcher = ToolDispatcher::new(ledger.clone(), hours.clone());
        Self {
            session_id,
            room_name,
            transport,
            providers,
            dispatcher,
            summaries,
            ledger,
            hours,
            rates,
            tools: tool_schemas(),
            cancel: CancellationToken::new(),
            phase: Arc::new(Mutex::new(SessionPhase::Connecting)),
            costs: Arc::new(Mutex::new(CostAccountant::default())),
            context: SessionContext::new(session_id),
            messages: Vec::new(),
        }
    }

    /// Registry-facing handle sharing this session's live state.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            room_name: self.room_name.clone(),
            started_at: self.context.started_at,
            cancel: self.cancel.clone(),
            phase: Arc::clone(&self.phase),
            costs: Arc::clone(&self.costs),
        }
    }

    /// Token that winds the session down when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drives the call to completion and reports what happened.
    ///
    /// Whatever ends the call, exactly one summary is generated and
    /// recorded before this returns.
    pub async fn run(mut self) -> SessionReport {
        let end = match self.drive().await {
            Ok(end) => end,
            Err(err) => {
                self.set_phase(SessionPhase::Error);
                match err {
                    SessionError::TransportLost => {
                        tracing::warn!(
                            session_id = %self.session_id,
                            "media link lost mid-call"
                        );
                        CallEnd::TransportLost
                    }
                    SessionError::Provider(err) => {
                        tracing::error!(
                            session_id = %self.session_id,
                            error = %err,
                            "provider failed past retry"
                        );
                        self.apologize().await;
                        CallEnd::ProviderFailure
                    }
                }
            }
        };
        self.finish(end).await
    }

    async fn drive(&mut self) -> Result<CallEnd, SessionError> {
        self.set_phase(SessionPhase::Connecting);
        self.warm_up_avatar();

        self.messages
            .push(ChatMessage::system(system_prompt(&self.hours)));
        self.speak(GREETING).await?;
        self.messages.push(ChatMessage::assistant(GREETING));

        loop {
            self.set_phase(SessionPhase::Listening);
            let cancel = self.cancel.clone();
            let audio = tokio::select! {
                _ = cancel.cancelled() => return Ok(CallEnd::Cancelled),
                next = self.transport.next_utterance() => match next {
                    Ok(Some(audio)) => audio,
                    Ok(None) => return Ok(CallEnd::HangUp),
                    Err(err) => {
                        tracing::warn!(error = %err, "transport dropped while listening");
                        return Err(SessionError::TransportLost);
                    }
                },
            };

            // The turn runs to completion even if an operator cancels
            // meanwhile, so no ledger write gets torn. The cancel lands at
            // the next loop edge.
            if let TurnFlow::Farewell = self.take_turn(audio).await? {
                return Ok(CallEnd::Farewell);
            }
            if self.cancel.is_cancelled() {
                return Ok(CallEnd::Cancelled);
            }
        }
    }

    /// One caller turn: transcribe, reason, run any tools, speak the reply.
    async fn take_turn(&mut self, audio: Vec<u8>) -> Result<TurnFlow, SessionError> {
        let segment = self.transcribe_with_retry(&audio).await?;
        lock(&self.costs).record_transcription(segment.audio_seconds);
        if segment.text.is_empty() {
            tracing::debug!("utterance transcribed to nothing, still listening");
            return Ok(TurnFlow::Continue);
        }

        tracing::info!(text = %segment.text, "caller said");
        self.context
            .transcript
            .push(Turn::now(Role::Caller, &segment.text));
        self.messages.push(ChatMessage::user(&segment.text));

        self.set_phase(SessionPhase::Reasoning);
        let reply = self.complete_with_retry().await?;
        lock(&self.costs).record_completion(reply.usage);

        if reply.tool_calls.is_empty() {
            let text = reply
                .content
                .unwrap_or_else(|| FALLBACK_REPLY.to_string());
            self.speak(&text).await?;
            self.messages.push(ChatMessage::assistant(text));
            return Ok(TurnFlow::Continue);
        }

        self.set_phase(SessionPhase::ToolExecuting);
        self.messages.push(ChatMessage::Assistant {
            content: reply.content.clone(),
            tool_calls: reply.tool_calls.clone(),
        });

        // Every call in the batch gets a result message, in order, so the
        // model's tool_call ids all resolve.
        let mut farewell: Option<String> = None;
        for call in &reply.tool_calls {
            let outcome = self.dispatcher.dispatch(call, &mut self.context).await;
            tracing::info!(tool = %call.name, result = %outcome.sentence, "tool executed");
            self.context
                .transcript
                .push(Turn::now(Role::Tool, &outcome.sentence));
            self.messages.push(ChatMessage::Tool {
                tool_call_id: call.id.clone(),
                content: outcome.sentence.clone(),
            });
            if outcome.end_call && farewell.is_none() {
                farewell = Some(outcome.sentence);
            }
        }

        if let Some(text) = farewell {
            self.speak(&text).await?;
            return Ok(TurnFlow::Farewell);
        }

        // One follow-up pass turns the tool results into speech. The model
        // does not get a second tool batch this turn.
        self.set_phase(SessionPhase::Reasoning);
        let followup = self.complete_with_retry().await?;
        lock(&self.costs).record_completion(followup.usage);

        let text = if followup.tool_calls.is_empty() {
            followup
                .content
                .unwrap_or_else(|| FALLBACK_REPLY.to_string())
        } else {
            tracing::warn!(
                requested = followup.tool_calls.len(),
                "model asked for more tools after its tool pass"
            );
            FALLBACK_REPLY.to_string()
        };
        self.speak(&text).await?;
        self.messages.push(ChatMessage::assistant(text));
        Ok(TurnFlow::Continue)
    }

    async fn transcribe_with_retry(
        &self,
        audio: &[u8],
    ) -> Result<TranscriptSegment, SessionError> {
        match self.providers.stt.transcribe(audio).await {
            Ok(segment) => Ok(segment),
            Err(err) if err.is_retryable() => {
                tracing::warn!(error = %err, "transcription failed, retrying once");
                tokio::time::sleep(RETRY_DELAY).await;
                Ok(self.providers.stt.transcribe(audio).await?)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn complete_with_retry(&self) -> Result<LlmReply, SessionError> {
        match self.providers.llm.complete(&self.messages, &self.tools).await {
            Ok(reply) => Ok(reply),
            Err(err) if err.is_retryable() => {
                tracing::warn!(error = %err, "completion failed, retrying once");
                tokio::time::sleep(RETRY_DELAY).await;
                Ok(self.providers.llm.complete(&self.messages, &self.tools).await?)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn synthesize_with_retry(&self, text: &str) -> Result<SpeechAudio, SessionError> {
        match self.providers.tts.synthesize(text).await {
            Ok(audio) => Ok(audio),
            Err(err) if err.is_retryable() => {
                tracing::warn!(error = %err, "synthesis failed, retrying once");
                tokio::time::sleep(RETRY_DELAY).await;
                Ok(self.providers.tts.synthesize(text).await?)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Synthesizes and plays one assistant line, mirroring it to the avatar
    /// when one is ready.
    async fn speak(&mut self, text: &str) -> Result<(), SessionError> {
        self.set_phase(SessionPhase::Responding);
        let audio = self.synthesize_with_retry(text).await?;
        lock(&self.costs).record_synthesis(audio.characters);

        let avatar_task = self
            .providers
            .avatar
            .as_ref()
            .filter(|avatar| avatar.is_ready())
            .cloned()
            .map(|avatar| {
                let line = text.to_string();
                tokio::spawn(async move { avatar.speak(&line).await })
            });

        if let Err(err) = self.transport.play(&audio).await {
            tracing::warn!(error = %err, "could not play the reply to the caller");
            return Err(SessionError::TransportLost);
        }

        if let Some(task) = avatar_task {
            match task.await {
                Ok(Ok(render)) => lock(&self.costs).record_render(render.video_seconds),
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "avatar could not mirror the reply");
                }
                Err(err) => tracing::warn!(error = %err, "avatar task failed"),
            }
        }

        self.context
            .transcript
            .push(Turn::now(Role::Assistant, text));
        Ok(())
    }

    /// Starts avatar warm-up without delaying the greeting.
    fn warm_up_avatar(&self) {
        let Some(avatar) = self.providers.avatar.clone() else {
            return;
        };
        let room = self.room_name.clone();
        let session_id = self.session_id;
        tokio::spawn(async move {
            let started = Instant::now();
            match avatar.warm_up(&room).await {
                Ok(()) => tracing::info!(
                    %session_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "avatar ready"
                ),
                Err(err) => tracing::warn!(
                    %session_id,
                    error = %err,
                    "avatar warm-up failed, continuing voice-only"
                ),
            }
        });
    }

    /// Best-effort apology before ending on provider failure. Errors here
    /// are logged and swallowed; the link may already be half-dead.
    async fn apologize(&mut self) {
        match self.providers.tts.synthesize(APOLOGY).await {
            Ok(audio) => {
                lock(&self.costs).record_synthesis(audio.characters);
                if let Err(err) = self.transport.play(&audio).await {
                    tracing::warn!(error = %err, "could not play the apology");
                } else {
                    self.context
                        .transcript
                        .push(Turn::now(Role::Assistant, APOLOGY));
                }
            }
            Err(err) => tracing::warn!(error = %err, "could not synthesize the apology"),
        }
    }

    /// Generates the summary, records it, and closes out the session.
    async fn finish(mut self, end: CallEnd) -> SessionReport {
        let duration_seconds = (Utc::now() - self.context.started_at).num_seconds();
        let draft = self.summaries.generate(&self.context, duration_seconds).await;
        let summary_recorded = match self.ledger.record_summary(draft).await {
            Ok(_) => true,
            Err(LedgerError::SummaryExists(_)) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    "summary was already recorded"
                );
                false
            }
            Err(err) => {
                tracing::error!(
                    session_id = %self.session_id,
                    error = %err,
                    "failed to record the summary"
                );
                false
            }
        };

        let cost = lock(&self.costs).estimate(&self.rates);
        self.set_phase(SessionPhase::Ended);
        self.cancel.cancel();

        tracing::info!(
            session_id = %self.session_id,
            end = ?end,
            turns = self.context.transcript.len(),
            total_usd = cost.total_usd,
            "session ended"
        );

        SessionReport {
            session_id: self.session_id,
            end,
            turns: self.context.transcript.len(),
            summary_recorded,
            cost,
        }
    }

    fn set_phase(&self, phase: SessionPhase) {
        *lock(&self.phase) = phase;
        tracing::debug!(
            session_id = %self.session_id,
            phase = phase.as_str(),
            "phase change"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_serialize_as_snake_case() {
        let json = serde_json::to_string(&SessionPhase::ToolExecuting).unwrap();
        assert_eq!(json, "\"tool_executing\"");
        assert_eq!(SessionPhase::ToolExecuting.as_str(), "tool_executing");
    }

    #[test]
    fn system_prompt_grounds_the_model() {
        let prompt = system_prompt(&BusinessHours::default());
        assert!(prompt.contains("Echo"));
        assert!(prompt.contains(&BusinessHours::default().describe()));
        assert!(prompt.contains("end_conversation"));
        assert!(prompt.contains("never read them aloud"));
    }
}
