//! OpenAI-compatible chat completion client with function calling.

use crate::config::LlmConfig;
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

const PROVIDER: &str = "openai";

/// One entry of the conversation sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    /// Standing instructions for the assistant.
    System { content: String },
    /// A caller utterance.
    User { content: String },
    /// An assistant reply, possibly requesting tool calls.
    Assistant {
        content: Option<String>,
        tool_calls: Vec<ToolCallRequest>,
    },
    /// The result of one executed tool call, fed back to the model.
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Wire form of the message for `/chat/completions`.
    fn to_wire(&self) -> Value {
        match self {
            Self::System { content } => json!({ "role": "system", "content": content }),
            Self::User { content } => json!({ "role": "user", "content": content }),
            Self::Assistant {
                content,
                tool_calls,
            } => {
                if tool_calls.is_empty() {
                    json!({ "role": "assistant", "content": content })
                } else {
                    let calls: Vec<Value> = tool_calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.id,
                                "type": "function",
                                "function": {
                                    "name": call.name,
                                    "arguments": call.arguments.to_string(),
                                }
                            })
                        })
                        .collect();
                    json!({ "role": "assistant", "content": content, "tool_calls": calls })
                }
            }
            Self::Tool {
                tool_call_id,
                content,
            } => json!({
                "role": "tool",
                "tool_call_id": tool_call_id,
                "content": content,
            }),
        }
    }
}

/// A callable tool advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON Schema of the tool arguments.
    pub parameters: Value,
}

impl ToolSchema {
    fn to_wire(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    /// Parsed argument object. `{}` when the model sent no arguments.
    pub arguments: Value,
}

/// Token counts for one completion, for cost accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// What the model produced for one reasoning pass.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmReply {
    /// Text to speak, when the model answered directly.
    pub content: Option<String>,
    /// Tool calls to execute, in order. Empty when the model answered
    /// directly.
    pub tool_calls: Vec<ToolCallRequest>,
    pub usage: TokenUsage,
}

/// Produces the assistant's next move from the conversation so far.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<LlmReply, ProviderError>;
}

/// Request body for `/chat/completions` (non-streaming).
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Value>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    message: Option<CompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    /// Arguments arrive as a JSON-encoded string.
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Default, Deserialize)]
struct UsageInfo {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

fn parse_reply(parsed: ChatCompletionResponse) -> Result<LlmReply, ProviderError> {
    let message = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .ok_or_else(|| ProviderError::invalid(PROVIDER, "response carried no choices"))?;

    let mut tool_calls = Vec::new();
    for call in message.tool_calls.unwrap_or_default() {
        let arguments = if call.function.arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(&call.function.arguments).map_err(|e| {
                ProviderError::invalid(
                    PROVIDER,
                    format!("tool call arguments are not valid JSON: {e}"),
                )
            })?
        };
        tool_calls.push(ToolCallRequest {
            id: call.id,
            name: call.function.name,
            arguments,
        });
    }

    let usage = parsed.usage.unwrap_or_default();
    Ok(LlmReply {
        content: message.content.filter(|c| !c.trim().is_empty()),
        tool_calls,
        usage: TokenUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        },
    })
}

/// OpenAI chat completion client.
#[derive(Debug, Clone)]
pub struct OpenAiLlm {
    http: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiLlm {
    pub fn new(http: reqwest::Client, config: LlmConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl LanguageModel for OpenAiLlm {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<LlmReply, ProviderError> {
        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(ChatMessage::to_wire).collect(),
            stream: false,
            temperature: Some(self.config.temperature),
            max_tokens: self.config.max_tokens,
            tools: if tools.is_empty() {
                None
            } else {
                Some(tools.iter().map(ToolSchema::to_wire).collect())
            },
            tool_choice: if tools.is_empty() {
                None
            } else {
                Some(json!("auto"))
            },
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let request = self
            .http
            .post(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            )
            .json(&body)
            .send();

        let response = tokio::time::timeout(Duration::from_millis(self.config.deadline_ms), request)
            .await
            .map_err(|_| ProviderError::Timeout {
                provider: PROVIDER,
                ms: self.config.deadline_ms,
            })?
            .map_err(|e| {
                tracing::error!(error = %e, "openai request failed");
                ProviderError::unavailable(PROVIDER, e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body, "openai returned an error");
            return Err(ProviderError::unavailable(
                PROVIDER,
                format!("status {status}"),
            ));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to deserialize openai response");
            ProviderError::invalid(PROVIDER, e.to_string())
        })?;

        parse_reply(parsed)
    }
}
