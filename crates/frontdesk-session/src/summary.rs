//! Post-call summary generation.
//!
//! Runs exactly once per session, after the call ends. The model sees the
//! tail of the transcript; if it cannot be reached the draft is assembled
//! from session facts instead, so a summary row always gets written.

use std::sync::Arc;
use std::time::Duration;

use frontdesk_ledger::SummaryDraft;
use frontdesk_types::{Role, SummaryOutcome};
use frontdesk_voice::{ChatMessage, LanguageModel};

use crate::context::SessionContext;

/// How many trailing transcript turns the summary model sees.
const TRANSCRIPT_WINDOW: usize = 20;

const RETRY_DELAY: Duration = Duration::from_millis(250);

const SUMMARY_PROMPT: &str = "You are summarizing a voice call between a caller and a \
     receptionist. Write 2 to 3 sentences covering who called, what they wanted, and \
     what was done. Be specific about any dates and times mentioned.";

/// Produces the one summary a finished call gets.
pub struct SummaryGenerator {
    llm: Arc<dyn LanguageModel>,
}

impl SummaryGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Generates the summary draft for a finished call.
    ///
    /// The model gets two attempts. If both fail, the draft carries the
    /// session facts verbatim and is tagged [`SummaryOutcome::Unknown`].
    pub async fn generate(&self, context: &SessionContext, duration_seconds: i64) -> SummaryDraft {
        let messages = [
            ChatMessage::system(SUMMARY_PROMPT),
            ChatMessage::user(format!(
                "Summarize this conversation:\n\n{}",
                conversation_text(context)
            )),
        ];

        let mut reply = self.llm.complete(&messages, &[]).await;
        if let Err(err) = &reply {
            tracing::warn!(error = %err, "summary attempt failed, retrying once");
            tokio::time::sleep(RETRY_DELAY).await;
            reply = self.llm.complete(&messages, &[]).await;
        }

        let (summary, outcome) = match reply {
            Ok(reply) => (
                reply
                    .content
                    .unwrap_or_else(|| "Call completed.".to_string()),
                context.outcome(),
            ),
            Err(err) => {
                tracing::error!(error = %err, "summary generation failed twice, recording facts");
                (fallback_text(context), SummaryOutcome::Unknown)
            }
        };

        SummaryDraft {
            session_id: context.session_id,
            user_id: context.user.as_ref().map(|u| u.id),
            summary,
            outcome,
            appointment_ids: context.appointment_ids(),
            duration_seconds: Some(duration_seconds),
        }
    }
}

fn conversation_text(context: &SessionContext) -> String {
    let turns = &context.transcript;
    let skip = turns.len().saturating_sub(TRANSCRIPT_WINDOW);
    let lines: Vec<String> = turns[skip..]
        .iter()
        .map(|turn| {
            let label = match turn.role {
                Role::Caller => "Caller",
                Role::Assistant => "Assistant",
                Role::Tool => "Tool",
            };
            format!("{label}: {}", turn.text)
        })
        .collect();
    lines.join("\n")
}

/// Plain statement of what the session recorded, for when no model is
/// reachable.
fn fallback_text(context: &SessionContext) -> String {
    let mut parts = Vec::new();
    if let Some(user) = &context.user {
        if let Some(name) = &user.display_name {
            parts.push(format!("Caller: {name}"));
        }
        parts.push(format!("Phone: {}", user.phone));
    }
    for (label, ids) in [
        ("Booked", context.booked()),
        ("Modified", context.modified()),
        ("Cancelled", context.cancelled()),
    ] {
        if !ids.is_empty() {
            parts.push(format!("{label} {} appointment(s)", ids.len()));
        }
    }

    if parts.is_empty() {
        "No actions taken.".to_string()
    } else {
        parts.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use frontdesk_types::{Turn, User};
    use frontdesk_voice::scripted::ScriptedLlm;
    use frontdesk_voice::{LlmReply, ProviderError, TokenUsage};
    use uuid::Uuid;

    fn caller(name: &str) -> User {
        User {
            id: Uuid::new_v4(),
            phone: "+15550102233".to_string(),
            display_name: Some(name.to_string()),
            created_at: Utc::now(),
        }
    }

    fn generator() -> (Arc<ScriptedLlm>, SummaryGenerator) {
        let llm = Arc::new(ScriptedLlm::new());
        let generator = SummaryGenerator::new(llm.clone());
        (llm, generator)
    }

    #[tokio::test]
    async fn summary_uses_model_reply_and_session_outcome() {
        let (llm, generator) = generator();
        llm.push_reply(ScriptedLlm::say(
            "Dana called to book a checkup and got Tuesday at 10 AM.",
        ));

        let mut context = SessionContext::new(Uuid::new_v4());
        context.user = Some(caller("Dana"));
        let appointment = Uuid::new_v4();
        context.note_booked(appointment);
        context
            .transcript
            .push(Turn::now(Role::Caller, "I'd like to book a checkup"));

        let draft = generator.generate(&context, 42).await;
        assert_eq!(
            draft.summary,
            "Dana called to book a checkup and got Tuesday at 10 AM."
        );
        assert_eq!(draft.outcome, SummaryOutcome::Booked);
        assert_eq!(draft.appointment_ids, vec![appointment]);
        assert_eq!(draft.duration_seconds, Some(42));
        assert_eq!(draft.user_id, context.user.as_ref().map(|u| u.id));

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert!(matches!(
            &requests[0][0],
            ChatMessage::System { content } if content.contains("summarizing a voice call")
        ));
        assert!(matches!(
            &requests[0][1],
            ChatMessage::User { content }
                if content.starts_with("Summarize this conversation:")
                    && content.contains("Caller: I'd like to book a checkup")
        ));
    }

    #[tokio::test]
    async fn summary_retries_once_after_a_provider_failure() {
        let (llm, generator) = generator();
        llm.push_failure(ProviderError::Timeout {
            provider: "scripted-llm",
            ms: 5,
        });
        llm.push_reply(ScriptedLlm::say("Short call, nothing booked."));

        let context = SessionContext::new(Uuid::new_v4());
        let draft = generator.generate(&context, 7).await;

        assert_eq!(draft.summary, "Short call, nothing booked.");
        assert_eq!(draft.outcome, SummaryOutcome::NoAction);
        assert_eq!(llm.requests().len(), 2);
    }

    #[tokio::test]
    async fn degraded_summary_assembles_session_facts() {
        let (llm, generator) = generator();
        llm.push_failure(ProviderError::Timeout {
            provider: "scripted-llm",
            ms: 5,
        });
        // Second attempt fails too: the reply script is exhausted.

        let mut context = SessionContext::new(Uuid::new_v4());
        context.user = Some(caller("Dana"));
        context.note_booked(Uuid::new_v4());
        context.note_cancelled(Uuid::new_v4());

        let draft = generator.generate(&context, 90).await;
        assert_eq!(
            draft.summary,
            "Caller: Dana | Phone: +15550102233 | Booked 1 appointment(s) | \
             Cancelled 1 appointment(s)"
        );
        assert_eq!(draft.outcome, SummaryOutcome::Unknown);
        assert_eq!(draft.appointment_ids.len(), 2);
    }

    #[tokio::test]
    async fn degraded_summary_without_facts_says_so() {
        let (_llm, generator) = generator();

        let context = SessionContext::new(Uuid::new_v4());
        let draft = generator.generate(&context, 3).await;

        assert_eq!(draft.summary, "No actions taken.");
        assert_eq!(draft.outcome, SummaryOutcome::Unknown);
        assert!(draft.user_id.is_none());
        assert!(draft.appointment_ids.is_empty());
    }

    #[tokio::test]
    async fn empty_model_reply_still_produces_a_summary() {
        let (llm, generator) = generator();
        llm.push_reply(LlmReply {
            content: None,
            tool_calls: Vec::new(),
            usage: TokenUsage::default(),
        });

        let context = SessionContext::new(Uuid::new_v4());
        let draft = generator.generate(&context, 12).await;

        assert_eq!(draft.summary, "Call completed.");
        assert_eq!(draft.outcome, SummaryOutcome::NoAction);
    }

    #[tokio::test]
    async fn transcript_window_drops_the_oldest_turns() {
        let (llm, generator) = generator();
        llm.push_reply(ScriptedLlm::say("A long chat."));

        let mut context = SessionContext::new(Uuid::new_v4());
        for i in 0..25 {
            context
                .transcript
                .push(Turn::now(Role::Caller, format!("turn number {i}")));
        }

        generator.generate(&context, 300).await;

        let requests = llm.requests();
        let ChatMessage::User { content } = &requests[0][1] else {
            panic!("second message should be the user prompt");
        };
        assert!(!content.contains("turn number 4\n"));
        assert!(content.contains("turn number 5"));
        assert!(content.contains("turn number 24"));
    }
}
