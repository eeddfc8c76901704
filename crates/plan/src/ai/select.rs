//! AI backend selection.
//!
//! A pure function over an explicit credentials struct picks exactly one
//! backend per call, in a fixed priority order, with no process-wide
//! caching. The ordering doubles as a reliability preference: providers
//! with known tool-calling schema friction sit lower in the list.

use std::sync::Arc;

use super::anthropic::AnthropicProvider;
use super::bedrock::BedrockProvider;
use super::gemini::GeminiProvider;
use super::openai::OpenAiProvider;
use super::provider::AiProvider;

/// AWS credential triple for the Bedrock backend.
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
}

/// Which credentials are present, read once per request.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    pub google_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub aws: Option<AwsCredentials>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

impl ProviderCredentials {
    /// Read credentials from the environment.
    pub fn from_env() -> Self {
        let aws = match (
            env_non_empty("AWS_ACCESS_KEY_ID"),
            env_non_empty("AWS_SECRET_ACCESS_KEY"),
        ) {
            (Some(access_key_id), Some(secret_access_key)) => Some(AwsCredentials {
                access_key_id,
                secret_access_key,
                region: env_non_empty("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            }),
            _ => None,
        };

        Self {
            google_api_key: env_non_empty("GOOGLE_GENERATIVE_AI_API_KEY"),
            anthropic_api_key: env_non_empty("ANTHROPIC_API_KEY"),
            aws,
            openai_api_key: env_non_empty("OPENAI_API_KEY"),
            openai_base_url: env_non_empty("OPENAI_BASE_URL"),
        }
    }

    /// True iff any of the four backends has credentials.
    pub fn is_configured(&self) -> bool {
        self.google_api_key.is_some()
            || self.anthropic_api_key.is_some()
            || self.aws.is_some()
            || self.openai_api_key.is_some()
    }
}

/// The selected backend, tagged with its default model tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Gemini flash tier: fast, cheap default
    Google,
    /// Claude haiku tier
    Anthropic,
    /// Claude Sonnet hosted on Bedrock
    Bedrock,
    /// OpenAI-compatible fallback; may be a dummy configuration
    OpenAiCompatible,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Self::Google => "gemini",
            Self::Anthropic => "anthropic",
            Self::Bedrock => "bedrock",
            Self::OpenAiCompatible => "openai",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Google => "gemini-2.0-flash",
            Self::Anthropic => "claude-3-5-haiku-20241022",
            Self::Bedrock => "anthropic.claude-sonnet-4-20250514-v1:0",
            Self::OpenAiCompatible => "gpt-4o-mini",
        }
    }
}

/// Pick the backend for a request. Deterministic, re-evaluated per call.
pub fn select_backend(creds: &ProviderCredentials) -> Backend {
    if creds.google_api_key.is_some() {
        Backend::Google
    } else if creds.anthropic_api_key.is_some() {
        Backend::Anthropic
    } else if creds.aws.is_some() {
        Backend::Bedrock
    } else {
        Backend::OpenAiCompatible
    }
}

/// A selected backend bound to a provider client and model id.
#[derive(Clone)]
pub struct ModelHandle {
    pub backend: Backend,
    pub model: String,
    pub provider: Arc<dyn AiProvider>,
}

/// Resolve a handle for the selected backend. Never fails: with no
/// credentials at all this returns an unconfigured OpenAI-compatible
/// handle that errors only when actually invoked.
pub fn get_model(creds: &ProviderCredentials) -> ModelHandle {
    let backend = select_backend(creds);
    let provider: Arc<dyn AiProvider> = match backend {
        Backend::Google => Arc::new(GeminiProvider::new(creds.google_api_key.clone())),
        Backend::Anthropic => Arc::new(AnthropicProvider::new(creds.anthropic_api_key.clone())),
        Backend::Bedrock => Arc::new(BedrockProvider::new(creds.aws.clone())),
        Backend::OpenAiCompatible => Arc::new(OpenAiProvider::new(
            creds.openai_api_key.clone(),
            creds.openai_base_url.clone(),
        )),
    };
    ModelHandle {
        backend,
        model: backend.default_model().to_string(),
        provider,
    }
}
