//! Per-session usage totals and their estimated cost.

use frontdesk_types::RateCard;
use frontdesk_voice::TokenUsage;
use serde::Serialize;

/// Running usage totals for one call, one field per billable category.
///
/// A pure observer: recording never fails and never blocks the turn loop.
/// The totals only become money when [`CostAccountant::estimate`] applies a
/// rate card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostAccountant {
    /// Seconds of caller audio sent to transcription.
    pub stt_seconds: f64,
    /// Characters sent to speech synthesis.
    pub tts_characters: u64,
    pub llm_prompt_tokens: u64,
    pub llm_completion_tokens: u64,
    /// Seconds of rendered avatar video.
    pub avatar_seconds: f64,
}

impl CostAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_transcription(&mut self, audio_seconds: f64) {
        self.stt_seconds += audio_seconds.max(0.0);
    }

    pub fn record_synthesis(&mut self, characters: u64) {
        self.tts_characters += characters;
    }

    pub fn record_completion(&mut self, usage: TokenUsage) {
        self.llm_prompt_tokens += usage.prompt_tokens;
        self.llm_completion_tokens += usage.completion_tokens;
    }

    pub fn record_render(&mut self, video_seconds: f64) {
        self.avatar_seconds += video_seconds.max(0.0);
    }

    /// Converts the accumulated usage into currency amounts.
    pub fn estimate(&self, rates: &RateCard) -> CostEstimate {
        let stt_usd = self.stt_seconds * rates.stt_per_second;
        let tts_usd = self.tts_characters as f64 * rates.tts_per_character;
        let llm_usd = self.llm_prompt_tokens as f64 / 1000.0 * rates.llm_prompt_per_1k
            + self.llm_completion_tokens as f64 / 1000.0 * rates.llm_completion_per_1k;
        let avatar_usd = self.avatar_seconds / 60.0 * rates.avatar_per_minute;

        CostEstimate {
            stt_usd,
            tts_usd,
            llm_usd,
            avatar_usd,
            total_usd: stt_usd + tts_usd + llm_usd + avatar_usd,
        }
    }
}

/// Estimated spend for one call, broken down by provider category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub stt_usd: f64,
    pub tts_usd: f64,
    pub llm_usd: f64,
    pub avatar_usd: f64,
    pub total_usd: f64,
}
