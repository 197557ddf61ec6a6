//! Provider registry for Innsikt.
//!
//! Static descriptions of the supported LLM providers: endpoint, model,
//! and which streaming wire dialect the endpoint speaks. Also builds the
//! per-provider HTTP request, since headers and payload shape are fixed
//! per provider.

use crate::error::{InnsiktError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    #[default]
    Anthropic,
    OpenAi,
    Google,
}

impl std::str::FromStr for ProviderId {
    type Err = InnsiktError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderId::Anthropic),
            "openai" | "gpt" => Ok(ProviderId::OpenAi),
            "google" | "gemini" => Ok(ProviderId::Google),
            other => Err(InnsiktError::UnknownProvider(other.to_string())),
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderId::Anthropic => write!(f, "anthropic"),
            ProviderId::OpenAi => write!(f, "openai"),
            ProviderId::Google => write!(f, "google"),
        }
    }
}

/// Streaming wire dialect spoken by a provider endpoint.
///
/// All three frame events as `data: {json}` lines, but each carries the
/// generated text at a different path inside the event JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Anthropic messages API: `content_block_delta` events.
    AnthropicSse,
    /// OpenAI chat completions: `choices[0].delta.content`.
    OpenAiSse,
    /// Google Gemini `streamGenerateContent` with `alt=sse`.
    GeminiSse,
}

/// Static description of one provider.
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    pub display_name: &'static str,
    pub endpoint: &'static str,
    pub model: &'static str,
    pub dialect: Dialect,
}

static REGISTRY: &[ProviderDescriptor] = &[
    ProviderDescriptor {
        id: ProviderId::Anthropic,
        display_name: "Anthropic",
        endpoint: "https://api.anthropic.com/v1/messages",
        model: "claude-sonnet-4-5-20250929",
        dialect: Dialect::AnthropicSse,
    },
    ProviderDescriptor {
        id: ProviderId::OpenAi,
        display_name: "OpenAI",
        endpoint: "https://api.openai.com/v1/chat/completions",
        model: "gpt-4o-mini",
        dialect: Dialect::OpenAiSse,
    },
    ProviderDescriptor {
        id: ProviderId::Google,
        display_name: "Google",
        endpoint: "https://generativelanguage.googleapis.com/v1beta/models",
        model: "gemini-2.0-flash",
        dialect: Dialect::GeminiSse,
    },
];

/// Look up the descriptor for a provider.
pub fn descriptor(id: ProviderId) -> &'static ProviderDescriptor {
    REGISTRY
        .iter()
        .find(|d| d.id == id)
        .expect("registry covers all ProviderId variants")
}

impl ProviderDescriptor {
    /// Build the streaming completion request for this provider.
    ///
    /// Each provider has a fixed header scheme and payload shape; the
    /// Gemini endpoint carries the key and SSE opt-in in the query string.
    pub fn build_request(
        &self,
        client: &reqwest::Client,
        secret: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> reqwest::RequestBuilder {
        match self.dialect {
            Dialect::AnthropicSse => client
                .post(self.endpoint)
                .header("x-api-key", secret)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&json!({
                    "model": self.model,
                    "max_tokens": max_tokens,
                    "stream": true,
                    "messages": [{ "role": "user", "content": prompt }],
                })),
            Dialect::OpenAiSse => client
                .post(self.endpoint)
                .bearer_auth(secret)
                .json(&json!({
                    "model": self.model,
                    "max_tokens": max_tokens,
                    "stream": true,
                    "messages": [{ "role": "user", "content": prompt }],
                })),
            Dialect::GeminiSse => {
                let url = format!(
                    "{}/{}:streamGenerateContent?key={}&alt=sse",
                    self.endpoint, self.model, secret
                );
                client.post(url).json(&json!({
                    "contents": [{ "parts": [{ "text": prompt }] }],
                    "generationConfig": { "maxOutputTokens": max_tokens },
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_descriptor_lookup() {
        let d = descriptor(ProviderId::Anthropic);
        assert_eq!(d.display_name, "Anthropic");
        assert_eq!(d.dialect, Dialect::AnthropicSse);

        let d = descriptor(ProviderId::Google);
        assert!(d.endpoint.contains("generativelanguage"));
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!(ProviderId::from_str("anthropic").unwrap(), ProviderId::Anthropic);
        assert_eq!(ProviderId::from_str("GPT").unwrap(), ProviderId::OpenAi);
        assert_eq!(ProviderId::from_str("gemini").unwrap(), ProviderId::Google);
        assert!(matches!(
            ProviderId::from_str("mistral"),
            Err(InnsiktError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_roundtrip_display() {
        for id in [ProviderId::Anthropic, ProviderId::OpenAi, ProviderId::Google] {
            assert_eq!(ProviderId::from_str(&id.to_string()).unwrap(), id);
        }
    }
}
