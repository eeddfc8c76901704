//! Anthropic Claude provider implementation.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::{PlanError, PlanResult};

use super::provider::{
    sse_text_stream, AiProvider, ChatMessage, ChatResponse, ChatRole, GenerateOptions, SseItem,
    TextStream, TokenUsage, ToolInvocation, ToolSpec,
};

/// Anthropic API endpoint
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic API version
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic API request message
#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

/// Tool declaration in Anthropic's schema
#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

/// Anthropic API request
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

/// Anthropic API response content block
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

/// Anthropic API usage
#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Anthropic API response
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    model: String,
    usage: AnthropicUsage,
}

/// Anthropic API error
#[derive(Debug, Deserialize)]
struct AnthropicError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

/// Anthropic API error response
#[derive(Debug, Deserialize)]
struct AnthropicErrorResponse {
    error: AnthropicError,
}

/// Streaming event subset: only what the text path needs
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum StreamEvent {
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { delta: ContentDelta },
    #[serde(rename = "message_stop")]
    MessageStop,
    #[serde(rename = "error")]
    Error { error: AnthropicError },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ContentDelta {
    #[serde(rename = "type")]
    delta_type: String,
    #[serde(default)]
    text: String,
}

/// Anthropic Claude provider.
pub struct AnthropicProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    /// Set a custom base URL (tests, proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn require_key(&self) -> PlanResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| PlanError::Ai("ANTHROPIC_API_KEY not set".to_string()))
    }

    /// Convert messages to Anthropic format, extracting the system message.
    fn convert_messages(&self, messages: &[ChatMessage]) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system = None;
        let mut converted = Vec::new();

        for msg in messages {
            match msg.role {
                ChatRole::System => {
                    // Anthropic uses a separate system field
                    system = Some(msg.content.clone());
                }
                ChatRole::User => converted.push(AnthropicMessage {
                    role: "user".to_string(),
                    content: msg.content.clone(),
                }),
                ChatRole::Assistant => converted.push(AnthropicMessage {
                    role: "assistant".to_string(),
                    content: msg.content.clone(),
                }),
            }
        }

        (system, converted)
    }

    fn build_request(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        options: &GenerateOptions,
        stream: bool,
    ) -> AnthropicRequest {
        let (system, converted) = self.convert_messages(messages);
        AnthropicRequest {
            model: model.to_string(),
            messages: converted,
            max_tokens: options.max_tokens.unwrap_or(4096),
            system,
            temperature: options.temperature,
            stop_sequences: options.stop_sequences.clone(),
            tools: tools
                .iter()
                .map(|t| AnthropicTool {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    input_schema: t.parameters.clone(),
                })
                .collect(),
            stream,
        }
    }

    async fn send(&self, request: &AnthropicRequest) -> PlanResult<reqwest::Response> {
        let api_key = self.require_key()?;
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| PlanError::Ai(format!("Anthropic API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| PlanError::Ai(format!("Failed to read response: {e}")))?;

            if let Ok(error_response) = serde_json::from_str::<AnthropicErrorResponse>(&body) {
                return Err(PlanError::Ai(format!(
                    "Anthropic API error: {} - {}",
                    error_response.error.error_type, error_response.error.message
                )));
            }
            return Err(PlanError::Ai(format!(
                "Anthropic API error ({status}): {body}"
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl AiProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
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

        tracing::debug!(model = %model, tools = tools.len(), "Calling Anthropic messages API");
        let response = self.send(&request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| PlanError::Ai(format!("Failed to read response: {e}")))?;

        let api_response: AnthropicResponse = serde_json::from_str(&body)
            .map_err(|e| PlanError::Ai(format!("Failed to parse response: {e}")))?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in api_response.content {
            match block {
                AnthropicContent::Text { text: t } => text.push_str(&t),
                AnthropicContent::ToolUse { name, input } => tool_calls.push(ToolInvocation {
                    name,
                    arguments: input,
                }),
                AnthropicContent::Other => {}
            }
        }

        Ok(ChatResponse {
            text,
            tool_calls,
            usage: TokenUsage {
                input_tokens: api_response.usage.input_tokens,
                output_tokens: api_response.usage.output_tokens,
                total_tokens: api_response.usage.input_tokens + api_response.usage.output_tokens,
            },
            model: api_response.model,
            provider: "anthropic".to_string(),
        })
    }

    async fn stream(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> PlanResult<TextStream> {
        let request = self.build_request(model, messages, &[], options, true);

        tracing::debug!(model = %model, "Calling Anthropic messages API (streaming)");
        let response = self.send(&request).await?;
        let byte_stream = response.bytes_stream().map(|r| r.map(|b| b.to_vec()));

        Ok(sse_text_stream(byte_stream, |data| {
            match serde_json::from_str::<StreamEvent>(data) {
                Ok(StreamEvent::ContentBlockDelta { delta }) => {
                    if delta.delta_type == "text_delta" {
                        Ok(SseItem::Text(delta.text))
                    } else {
                        Ok(SseItem::Skip)
                    }
                }
                Ok(StreamEvent::MessageStop) => Ok(SseItem::Done),
                Ok(StreamEvent::Error { error }) => Err(PlanError::Ai(format!(
                    "Stream error: {} - {}",
                    error.error_type, error.message
                ))),
                _ => Ok(SseItem::Skip),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name() {
        let provider = AnthropicProvider::new(None);
        assert_eq!(provider.name(), "anthropic");
        assert!(!provider.is_configured());
    }

    #[test]
    fn test_message_conversion() {
        let provider = AnthropicProvider::new(Some("key".to_string()));
        let messages = vec![
            ChatMessage::system("You are a planning assistant"),
            ChatMessage::user("Hello"),
            ChatMessage::assistant("Hi there!"),
            ChatMessage::user("Break this down"),
        ];

        let (system, converted) = provider.convert_messages(&messages);

        assert_eq!(system, Some("You are a planning assistant".to_string()));
        assert_eq!(converted.len(), 3);
        assert_eq!(converted[0].role, "user");
        assert_eq!(converted[1].role, "assistant");
        assert_eq!(converted[2].role, "user");
    }

    #[test]
    fn test_response_parsing_with_tool_use() {
        let body = r#"{
            "content": [
                {"type": "text", "text": "Creating the phase."},
                {"type": "tool_use", "id": "tu_1", "name": "create_phase",
                 "input": {"title": "Backend", "description": "API work"}}
            ],
            "model": "claude-3-5-haiku-20241022",
            "usage": {"input_tokens": 10, "output_tokens": 20}
        }"#;
        let parsed: AnthropicResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.content.len(), 2);
        assert!(matches!(
            &parsed.content[1],
            AnthropicContent::ToolUse { name, .. } if name == "create_phase"
        ));
    }

    #[test]
    fn test_generate_without_key_fails() {
        let provider = AnthropicProvider::new(None);
        assert!(provider.require_key().is_err());
    }

    #[tokio::test]
    async fn test_generate_against_mock() {
        use wiremock::matchers::{header, method};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "hello"}],
                "model": "claude-3-5-haiku-20241022",
                "usage": {"input_tokens": 5, "output_tokens": 3}
            })))
            .mount(&server)
            .await;

        let provider =
            AnthropicProvider::new(Some("test-key".to_string())).with_base_url(server.uri());
        let response = provider
            .generate(
                "claude-3-5-haiku-20241022",
                &[ChatMessage::user("hi")],
                &[],
                &GenerateOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(response.text, "hello");
        assert_eq!(response.usage.total_tokens, 8);
    }
}
