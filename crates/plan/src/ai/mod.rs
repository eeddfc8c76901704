//! AI backends, model selection and chat orchestration.

pub mod anthropic;
pub mod bedrock;
pub mod chat;
pub mod gemini;
pub mod openai;
pub mod prompts;
pub mod provider;
pub mod select;
pub mod tools;

pub use chat::{ChatOrchestrator, ChatOutcome, ToolReport};
pub use provider::{
    AiProvider, ChatMessage, ChatResponse, ChatRole, GenerateOptions, TextStream, TokenUsage,
    ToolInvocation, ToolSpec,
};
pub use select::{Backend, ModelHandle, ProviderCredentials};
pub use tools::ToolCall;
