//! Google Gemini provider implementation.
//!
//! First in the selector's priority order: the flash tier is the fast,
//! cheap default. Tool declarations go over the `functionDeclarations`
//! schema and come back as `functionCall` parts.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::{PlanError, PlanResult};

use super::provider::{
    sse_text_stream, AiProvider, ChatMessage, ChatResponse, ChatRole, GenerateOptions, SseItem,
    TextStream, TokenUsage, ToolInvocation, ToolSpec,
};

/// Google Generative Language API base URL
const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(
        default,
        rename = "functionCall",
        skip_serializing_if = "Option::is_none"
    )]
    function_call: Option<GeminiFunctionCall>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct GeminiTools {
    #[serde(rename = "functionDeclarations")]
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTools>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

/// Google Gemini provider.
pub struct GeminiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: GEMINI_API_URL.to_string(),
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
            .ok_or_else(|| PlanError::Ai("GOOGLE_GENERATIVE_AI_API_KEY not set".to_string()))
    }

    /// Convert messages to Gemini contents, extracting the system
    /// instruction. Gemini names the assistant role "model".
    fn convert_messages(
        &self,
        messages: &[ChatMessage],
    ) -> (Option<GeminiContent>, Vec<GeminiContent>) {
        let mut system = None;
        let mut contents = Vec::new();

        for msg in messages {
            let part = GeminiPart {
                text: Some(msg.content.clone()),
                function_call: None,
            };
            match msg.role {
                ChatRole::System => {
                    system = Some(GeminiContent {
                        role: None,
                        parts: vec![part],
                    });
                }
                ChatRole::User => contents.push(GeminiContent {
                    role: Some("user".to_string()),
                    parts: vec![part],
                }),
                ChatRole::Assistant => contents.push(GeminiContent {
                    role: Some("model".to_string()),
                    parts: vec![part],
                }),
            }
        }

        (system, contents)
    }

    fn build_request(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        options: &GenerateOptions,
    ) -> GeminiRequest {
        let (system_instruction, contents) = self.convert_messages(messages);
        let tools = if tools.is_empty() {
            Vec::new()
        } else {
            vec![GeminiTools {
                function_declarations: tools
                    .iter()
                    .map(|t| GeminiFunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    })
                    .collect(),
            }]
        };

        GeminiRequest {
            contents,
            system_instruction,
            tools,
            generation_config: GeminiGenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
                stop_sequences: options.stop_sequences.clone(),
            },
        }
    }

    async fn send(&self, url: String, request: &GeminiRequest) -> PlanResult<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| PlanError::Ai(format!("Gemini API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| PlanError::Ai(format!("Failed to read response: {e}")))?;

            if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(&body) {
                return Err(PlanError::Ai(format!(
                    "Gemini API error: {} - {}",
                    error_response.error.status.unwrap_or_default(),
                    error_response.error.message
                )));
            }
            return Err(PlanError::Ai(format!("Gemini API error ({status}): {body}")));
        }
        Ok(response)
    }
}

#[async_trait]
impl AiProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
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
        let api_key = self.require_key()?;
        let url = format!(
            "{}/models/{model}:generateContent?key={api_key}",
            self.base_url
        );
        let request = self.build_request(messages, tools, options);

        tracing::debug!(model = %model, tools = tools.len(), "Calling Gemini generateContent");
        let response = self.send(url, &request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| PlanError::Ai(format!("Failed to read response: {e}")))?;

        let api_response: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| PlanError::Ai(format!("Failed to parse response: {e}")))?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        if let Some(content) = api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
        {
            for part in content.parts {
                if let Some(t) = part.text {
                    text.push_str(&t);
                }
                if let Some(call) = part.function_call {
                    tool_calls.push(ToolInvocation {
                        name: call.name,
                        arguments: call.args,
                    });
                }
            }
        }

        let usage = api_response
            .usage_metadata
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            });

        Ok(ChatResponse {
            text,
            tool_calls,
            usage,
            model: model.to_string(),
            provider: "gemini".to_string(),
        })
    }

    async fn stream(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> PlanResult<TextStream> {
        let api_key = self.require_key()?;
        let url = format!(
            "{}/models/{model}:streamGenerateContent?alt=sse&key={api_key}",
            self.base_url
        );
        let request = self.build_request(messages, &[], options);

        tracing::debug!(model = %model, "Calling Gemini streamGenerateContent");
        let response = self.send(url, &request).await?;
        let byte_stream = response.bytes_stream().map(|r| r.map(|b| b.to_vec()));

        Ok(sse_text_stream(byte_stream, |data| {
            match serde_json::from_str::<GeminiResponse>(data) {
                Ok(chunk) => {
                    let text = chunk
                        .candidates
                        .into_iter()
                        .next()
                        .and_then(|c| c.content)
                        .map(|content| {
                            content
                                .parts
                                .into_iter()
                                .filter_map(|p| p.text)
                                .collect::<String>()
                        })
                        .unwrap_or_default();
                    Ok(SseItem::Text(text))
                }
                Err(_) => Ok(SseItem::Skip),
            }
        }))
    }
}
