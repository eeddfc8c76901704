//! AI provider trait and common types.
//!
//! Defines the uniform "generate or stream text, with optional tool
//! declarations and returned tool calls" capability the rest of the system
//! depends on, regardless of which hosted backend is live.

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::errors::{PlanError, PlanResult};

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System message (sets context/behavior)
    System,
    /// User message (input)
    User,
    /// Assistant message (AI response)
    Assistant,
}

/// A message in a conversation with an AI model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Token usage information from an AI response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// Wire declaration of a callable tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON-schema parameter spec
    pub parameters: serde_json::Value,
}

/// A tool call proposed by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Response from an AI model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Generated text content
    pub text: String,
    /// Tool calls the model chose to make, in order
    #[serde(default)]
    pub tool_calls: Vec<ToolInvocation>,
    pub usage: TokenUsage,
    /// Model that generated the response
    pub model: String,
    /// Provider that generated the response
    pub provider: String,
}

/// Options for text generation.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Temperature for sampling (0.0 to 1.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Stop sequences
    pub stop_sequences: Option<Vec<String>>,
}

/// One-way server-to-client text chunk stream.
pub type TextStream = Pin<Box<dyn Stream<Item = PlanResult<String>> + Send>>;

/// Trait for AI providers.
///
/// All backends (Gemini, Anthropic, Bedrock, OpenAI-compatible) implement
/// this trait.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Provider name (e.g. "anthropic", "gemini").
    fn name(&self) -> &'static str;

    /// Whether credentials are present. An unconfigured provider constructs
    /// fine and fails only when invoked.
    fn is_configured(&self) -> bool;

    /// Generate a response, optionally declaring tools the model may call.
    async fn generate(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        options: &GenerateOptions,
    ) -> PlanResult<ChatResponse>;

    /// Stream text chunks as they arrive. No tool calling on this path.
    async fn stream(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> PlanResult<TextStream>;
}

/// Parse a structured object out of an AI response.
///
/// Standalone function rather than a trait method because generic methods
/// are not dyn-compatible.
pub fn parse_ai_response<T: for<'de> Deserialize<'de>>(response: &ChatResponse) -> PlanResult<T> {
    let text = response.text.trim();

    // Sometimes the AI wraps JSON in markdown code blocks
    let json_text = if text.starts_with("```json") {
        text.strip_prefix("```json")
            .and_then(|s| s.strip_suffix("```"))
            .unwrap_or(text)
            .trim()
    } else if text.starts_with("```") {
        text.strip_prefix("```")
            .and_then(|s| s.strip_suffix("```"))
            .unwrap_or(text)
            .trim()
    } else {
        text
    };

    serde_json::from_str(json_text).map_err(|e| PlanError::AiResponseParse {
        reason: format!("Failed to parse AI response as JSON: {e}. Response: {text}"),
    })
}

/// What an SSE `data:` payload contributed to the text stream.
pub(crate) enum SseItem {
    Text(String),
    Done,
    Skip,
}

/// Turn a raw byte stream of SSE events into a text-chunk stream.
///
/// Buffers until a complete `\n\n`-terminated event is available, then
/// hands each `data:` payload to the provider-specific extractor. An
/// extractor error ends the stream after the error is yielded.
pub(crate) fn sse_text_stream<S, F>(byte_stream: S, extract: F) -> TextStream
where
    S: Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send + Unpin + 'static,
    F: FnMut(&str) -> PlanResult<SseItem> + Send + 'static,
{
    struct State<S, F> {
        stream: S,
        extract: F,
        buffer: String,
        queue: VecDeque<PlanResult<String>>,
        done: bool,
    }

    let state = State {
        stream: byte_stream,
        extract,
        buffer: String::new(),
        queue: VecDeque::new(),
        done: false,
    };

    Box::pin(futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.queue.pop_front() {
                return Some((item, st));
            }
            if st.done {
                return None;
            }

            match st.stream.next().await {
                None => st.done = true,
                Some(Err(e)) => {
                    st.done = true;
                    st.queue
                        .push_back(Err(PlanError::Ai(format!("Stream read error: {e}"))));
                }
                Some(Ok(chunk)) => {
                    st.buffer.push_str(&String::from_utf8_lossy(&chunk));

                    // Process complete SSE events from the buffer
                    while let Some(event_end) = st.buffer.find("\n\n") {
                        if st.done {
                            break;
                        }
                        let event_data = st.buffer[..event_end].to_string();
                        st.buffer = st.buffer[event_end + 2..].to_string();

                        for line in event_data.lines() {
                            if st.done {
                                break;
                            }
                            if let Some(data) = line.strip_prefix("data: ") {
                                if data == "[DONE]" {
                                    st.done = true;
                                    continue;
                                }
                                match (st.extract)(data) {
                                    Ok(SseItem::Text(text)) if !text.is_empty() => {
                                        st.queue.push_back(Ok(text));
                                    }
                                    Ok(SseItem::Done) => st.done = true,
                                    Ok(_) => {}
                                    Err(e) => {
                                        st.done = true;
                                        st.queue.push_back(Err(e));
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ai_response_plain() {
        let response = ChatResponse {
            text: r#"{"value": 42}"#.to_string(),
            tool_calls: Vec::new(),
            usage: TokenUsage::default(),
            model: "test".to_string(),
            provider: "test".to_string(),
        };
        let parsed: serde_json::Value = parse_ai_response(&response).unwrap();
        assert_eq!(parsed["value"], 42);
    }

    #[test]
    fn test_parse_ai_response_fenced() {
        let response = ChatResponse {
            text: "```json\n{\"value\": 42}\n```".to_string(),
            tool_calls: Vec::new(),
            usage: TokenUsage::default(),
            model: "test".to_string(),
            provider: "test".to_string(),
        };
        let parsed: serde_json::Value = parse_ai_response(&response).unwrap();
        assert_eq!(parsed["value"], 42);
    }

    #[test]
    fn test_parse_ai_response_invalid() {
        let response = ChatResponse {
            text: "not json at all".to_string(),
            tool_calls: Vec::new(),
            usage: TokenUsage::default(),
            model: "test".to_string(),
            provider: "test".to_string(),
        };
        let result: PlanResult<serde_json::Value> = parse_ai_response(&response);
        assert!(matches!(result, Err(PlanError::AiResponseParse { .. })));
    }

    #[tokio::test]
    async fn test_sse_text_stream_extracts_chunks() {
        let bytes = b"data: hello\n\ndata: world\n\ndata: [DONE]\n\n".to_vec();
        let byte_stream = futures::stream::iter(vec![Ok(bytes)]);

        let mut stream = sse_text_stream(byte_stream, |data| {
            Ok(SseItem::Text(data.to_string()))
        });

        let mut chunks = Vec::new();
        while let Some(item) = stream.next().await {
            chunks.push(item.unwrap());
        }
        assert_eq!(chunks, vec!["hello", "world"]);
    }

    #[tokio::test]
    async fn test_sse_text_stream_split_across_chunks() {
        let byte_stream = futures::stream::iter(vec![
            Ok(b"data: hel".to_vec()),
            Ok(b"lo\n\nda".to_vec()),
            Ok(b"ta: world\n\n".to_vec()),
        ]);

        let mut stream = sse_text_stream(byte_stream, |data| {
            Ok(SseItem::Text(data.to_string()))
        });

        let mut chunks = Vec::new();
        while let Some(item) = stream.next().await {
            chunks.push(item.unwrap());
        }
        assert_eq!(chunks, vec!["hello", "world"]);
    }

    #[tokio::test]
    async fn test_sse_text_stream_surfaces_extractor_error() {
        let byte_stream =
            futures::stream::iter(vec![Ok(b"data: bad\n\ndata: after\n\n".to_vec())]);

        let mut stream = sse_text_stream(byte_stream, |_| {
            Err(PlanError::Ai("boom".to_string()))
        });

        let first = stream.next().await.unwrap();
        assert!(first.is_err());
        assert!(stream.next().await.is_none());
    }
}
