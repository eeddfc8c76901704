//! OpenAI-compatible provider implementation.
//!
//! Speaks the chat-completions dialect, so it also fronts compatible
//! gateways via a base-url override. This is the selector's fallback
//! backend: it constructs fine without a key and fails only when invoked.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::{PlanError, PlanResult};

use super::provider::{
    sse_text_stream, AiProvider, ChatMessage, ChatResponse, ChatRole, GenerateOptions, SseItem,
    TextStream, TokenUsage, ToolInvocation, ToolSpec,
};

/// Default OpenAI API base URL
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI API request message
#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

/// Tool declaration wrapper
#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// OpenAI API request
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAiTool>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCallFunction {
    name: String,
    /// JSON-encoded arguments string
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCall {
    function: OpenAiToolCallFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<OpenAiToolCall>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    model: String,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiError,
}

/// Streaming chunk: choices[].delta.content
#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    #[serde(default)]
    delta: OpenAiStreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiStreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible provider.
pub struct OpenAiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: Option<String>, base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn convert_messages(&self, messages: &[ChatMessage]) -> Vec<OpenAiMessage> {
        messages
            .iter()
            .map(|msg| OpenAiMessage {
                role: match msg.role {
                    ChatRole::System => "system".to_string(),
                    ChatRole::User => "user".to_string(),
                    ChatRole::Assistant => "assistant".to_string(),
                },
                content: msg.content.clone(),
            })
            .collect()
    }

    fn build_request(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        options: &GenerateOptions,
        stream: bool,
    ) -> OpenAiRequest {
        OpenAiRequest {
            model: model.to_string(),
            messages: self.convert_messages(messages),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            stop: options.stop_sequences.clone(),
            tools: tools
                .iter()
                .map(|t| OpenAiTool {
                    tool_type: "function".to_string(),
                    function: OpenAiFunction {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    },
                })
                .collect(),
            stream,
        }
    }

    async fn send(&self, request: &OpenAiRequest) -> PlanResult<reqwest::Response> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PlanError::Ai("OPENAI_API_KEY not set".to_string()))?;

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| PlanError::Ai(format!("OpenAI API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| PlanError::Ai(format!("Failed to read response: {e}")))?;

            if let Ok(error_response) = serde_json::from_str::<OpenAiErrorResponse>(&body) {
                return Err(PlanError::Ai(format!(
                    "OpenAI API error: {}",
                    error_response.error.message
                )));
            }
            return Err(PlanError::Ai(format!("OpenAI API error ({status}): {body}")));
        }
        Ok(response)
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        options: &GenerateOptions,
    ) -> PlanResult<ChatResponse> {
        let request = self.build_request(model, messages, tools, options, false);

        tracing::debug!(model = %model, tools = tools.len(), "Calling chat completions API");
        let response = self.send(&request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| PlanError::Ai(format!("Failed to read response: {e}")))?;

        let api_response: OpenAiResponse = serde_json::from_str(&body)
            .map_err(|e| PlanError::Ai(format!("Failed to parse response: {e}")))?;

        let choice = api_response.choices.into_iter().next();
        let text = choice
            .as_ref()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        let mut tool_calls = Vec::new();
        if let Some(choice) = choice {
            for call in choice.message.tool_calls {
                // Arguments arrive as a JSON-encoded string
                let arguments = serde_json::from_str(&call.function.arguments)
                    .map_err(|e| PlanError::AiResponseParse {
                        reason: format!(
                            "tool call '{}' has invalid arguments: {e}",
                            call.function.name
                        ),
                    })?;
                tool_calls.push(ToolInvocation {
                    name: call.function.name,
                    arguments,
                });
            }
        }

        let usage = api_response.usage.map_or_else(TokenUsage::default, |u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ChatResponse {
            text,
            tool_calls,
            usage,
            model: api_response.model,
            provider: "openai".to_string(),
        })
    }

    async fn stream(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> PlanResult<TextStream> {
        let request = self.build_request(model, messages, &[], options, true);

        tracing::debug!(model = %model, "Calling chat completions API (streaming)");
        let response = self.send(&request).await?;
        let byte_stream = response.bytes_stream().map(|r| r.map(|b| b.to_vec()));

        Ok(sse_text_stream(byte_stream, |data| {
            match serde_json::from_str::<OpenAiStreamChunk>(data) {
                Ok(chunk) => {
                    let text = chunk
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|c| c.delta.content)
                        .unwrap_or_default();
                    Ok(SseItem::Text(text))
                }
                Err(_) => Ok(SseItem::Skip),
            }
        }))
    }
}
