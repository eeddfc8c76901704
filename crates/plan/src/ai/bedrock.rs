//! AWS Bedrock provider implementation (Anthropic models).
//!
//! Invokes Claude on Bedrock through the `InvokeModel` REST endpoint with
//! a minimal SigV4 signer. Streaming degrades to a single final chunk:
//! the AWS event-stream binary framing is not decoded here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{PlanError, PlanResult};

use super::provider::{
    AiProvider, ChatMessage, ChatResponse, ChatRole, GenerateOptions, TextStream, TokenUsage,
    ToolInvocation, ToolSpec,
};
use super::select::AwsCredentials;

type HmacSha256 = Hmac<Sha256>;

/// Bedrock's Anthropic body version tag
const ANTHROPIC_BEDROCK_VERSION: &str = "bedrock-2023-05-31";

#[derive(Debug, Serialize)]
struct BedrockMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct BedrockTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

/// InvokeModel body for Anthropic-on-Bedrock
#[derive(Debug, Serialize)]
struct BedrockRequest {
    anthropic_version: String,
    max_tokens: u32,
    messages: Vec<BedrockMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<BedrockTool>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum BedrockContent {
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

#[derive(Debug, Default, Deserialize)]
struct BedrockUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct BedrockResponse {
    content: Vec<BedrockContent>,
    #[serde(default)]
    usage: BedrockUsage,
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Percent-encode a path segment per SigV4 canonical-URI rules.
/// Model ids carry ':' which must become %3A in both the request path
/// and the canonical request.
fn encode_path_segment(segment: &str) -> String {
    segment
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

/// AWS Bedrock provider.
pub struct BedrockProvider {
    client: Client,
    creds: Option<AwsCredentials>,
}

impl BedrockProvider {
    pub fn new(creds: Option<AwsCredentials>) -> Self {
        Self {
            client: Client::new(),
            creds,
        }
    }

    fn require_creds(&self) -> PlanResult<&AwsCredentials> {
        self.creds
            .as_ref()
            .ok_or_else(|| PlanError::Ai("AWS credentials not set".to_string()))
    }

    fn convert_messages(&self, messages: &[ChatMessage]) -> (Option<String>, Vec<BedrockMessage>) {
        let mut system = None;
        let mut converted = Vec::new();
        for msg in messages {
            match msg.role {
                ChatRole::System => system = Some(msg.content.clone()),
                ChatRole::User => converted.push(BedrockMessage {
                    role: "user".to_string(),
                    content: msg.content.clone(),
                }),
                ChatRole::Assistant => converted.push(BedrockMessage {
                    role: "assistant".to_string(),
                    content: msg.content.clone(),
                }),
            }
        }
        (system, converted)
    }

    /// SigV4 signature over a query-less POST to the Bedrock runtime.
    fn sign(
        creds: &AwsCredentials,
        host: &str,
        canonical_uri: &str,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> (String, String) {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let payload_hash = sha256_hex(payload);

        let canonical_headers = format!(
            "content-type:application/json\nhost:{host}\nx-amz-date:{amz_date}\n"
        );
        let signed_headers = "content-type;host;x-amz-date";
        let canonical_request = format!(
            "POST\n{canonical_uri}\n\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
        );

        let scope = format!("{date}/{}/bedrock/aws4_request", creds.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
            sha256_hex(canonical_request.as_bytes())
        );

        let k_date = hmac_sha256(
            format!("AWS4{}", creds.secret_access_key).as_bytes(),
            date.as_bytes(),
        );
        let k_region = hmac_sha256(&k_date, creds.region.as_bytes());
        let k_service = hmac_sha256(&k_region, b"bedrock");
        let k_signing = hmac_sha256(&k_service, b"aws4_request");
        let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes()));

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            creds.access_key_id
        );
        (authorization, amz_date)
    }
}

#[async_trait]
impl AiProvider for BedrockProvider {
    fn name(&self) -> &'static str {
        "bedrock"
    }

    fn is_configured(&self) -> bool {
        self.creds.is_some()
    }

    async fn generate(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        options: &GenerateOptions,
    ) -> PlanResult<ChatResponse> {
        let creds = self.require_creds()?;
        let (system, converted) = self.convert_messages(messages);

        let request = BedrockRequest {
            anthropic_version: ANTHROPIC_BEDROCK_VERSION.to_string(),
            max_tokens: options.max_tokens.unwrap_or(4096),
            messages: converted,
            system,
            temperature: options.temperature,
            stop_sequences: options.stop_sequences.clone(),
            tools: tools
                .iter()
                .map(|t| BedrockTool {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    input_schema: t.parameters.clone(),
                })
                .collect(),
        };
        let payload = serde_json::to_vec(&request)?;

        let host = format!("bedrock-runtime.{}.amazonaws.com", creds.region);
        let canonical_uri = format!("/model/{}/invoke", encode_path_segment(model));
        let (authorization, amz_date) =
            Self::sign(creds, &host, &canonical_uri, &payload, Utc::now());

        tracing::debug!(model = %model, region = %creds.region, "Calling Bedrock InvokeModel");
        let response = self
            .client
            .post(format!("https://{host}{canonical_uri}"))
            .header("content-type", "application/json")
            .header("x-amz-date", amz_date)
            .header("authorization", authorization)
            .body(payload)
            .send()
            .await
            .map_err(|e| PlanError::Ai(format!("Bedrock API request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PlanError::Ai(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(PlanError::Ai(format!("Bedrock API error ({status}): {body}")));
        }

        let api_response: BedrockResponse = serde_json::from_str(&body)
            .map_err(|e| PlanError::Ai(format!("Failed to parse response: {e}")))?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in api_response.content {
            match block {
                BedrockContent::Text { text: t } => text.push_str(&t),
                BedrockContent::ToolUse { name, input } => tool_calls.push(ToolInvocation {
                    name,
                    arguments: input,
                }),
                BedrockContent::Other => {}
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
            model: model.to_string(),
            provider: "bedrock".to_string(),
        })
    }

    /// Single-chunk degradation: one final text chunk instead of a true
    /// token stream.
    async fn stream(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> PlanResult<TextStream> {
        let response = self.generate(model, messages, &[], options).await?;
        Ok(Box::pin(futures::stream::once(async move {
            Ok(response.text)
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn creds() -> AwsCredentials {
        AwsCredentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY".to_string(),
            region: "us-east-1".to_string(),
        }
    }

    #[test]
    fn test_provider_name() {
        let provider = BedrockProvider::new(None);
        assert_eq!(provider.name(), "bedrock");
        assert!(!provider.is_configured());
    }

    #[test]
    fn test_encode_path_segment() {
        assert_eq!(
            encode_path_segment("anthropic.claude-sonnet-4-20250514-v1:0"),
            "anthropic.claude-sonnet-4-20250514-v1%3A0"
        );
        assert_eq!(encode_path_segment("plain-model"), "plain-model");
    }

    #[test]
    fn test_signature_is_deterministic() {
        let now = Utc.with_ymd_and_hms(2026, 8, 28, 12, 0, 0).unwrap();
        let (auth_a, date_a) = BedrockProvider::sign(
            &creds(),
            "bedrock-runtime.us-east-1.amazonaws.com",
            "/model/test/invoke",
            b"{}",
            now,
        );
        let (auth_b, date_b) = BedrockProvider::sign(
            &creds(),
            "bedrock-runtime.us-east-1.amazonaws.com",
            "/model/test/invoke",
            b"{}",
            now,
        );
        assert_eq!(auth_a, auth_b);
        assert_eq!(date_a, date_b);
        assert_eq!(date_a, "20260828T120000Z");
        assert!(auth_a.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20260828/us-east-1/bedrock/aws4_request"));
        assert!(auth_a.contains("SignedHeaders=content-type;host;x-amz-date"));
    }

    #[test]
    fn test_signature_varies_with_payload() {
        let now = Utc.with_ymd_and_hms(2026, 8, 28, 12, 0, 0).unwrap();
        let host = "bedrock-runtime.us-east-1.amazonaws.com";
        let (auth_a, _) = BedrockProvider::sign(&creds(), host, "/model/test/invoke", b"{}", now);
        let (auth_b, _) =
            BedrockProvider::sign(&creds(), host, "/model/test/invoke", b"{\"x\":1}", now);
        assert_ne!(auth_a, auth_b);
    }

    #[tokio::test]
    async fn test_generate_without_creds_fails() {
        let provider = BedrockProvider::new(None);
        let result = provider
            .generate(
                "anthropic.claude-sonnet-4-20250514-v1:0",
                &[ChatMessage::user("hi")],
                &[],
                &GenerateOptions::default(),
            )
            .await;
        assert!(matches!(result, Err(PlanError::Ai(_))));
    }
}
