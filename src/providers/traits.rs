//! Provider trait definitions for hosted model integrations
//!
//! Each text provider (Anthropic, OpenAI, OpenRouter) implements
//! [`LlmProvider`]; the image model implements [`ImageProvider`]. Handlers
//! only ever see the traits, picked through the [`ProviderRegistry`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Provider error types
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("API Error: {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("API key not configured")]
    NotConfigured(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Error envelope shared by the OpenAI- and Anthropic-style APIs
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
}

/// Turn a provider response into a typed body or a [`ProviderError`].
///
/// A JSON body carrying `error.message` wins over the HTTP status; some
/// gateways answer 200 with an error envelope.
pub fn parse_response<T: serde::de::DeserializeOwned>(status: u16, body: &str) -> ProviderResult<T> {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return Err(ProviderError::Api {
            status,
            message: envelope.error.message.unwrap_or_else(|| "Unknown error".to_string()),
        });
    }

    if !(200..300).contains(&status) {
        return Err(ProviderError::Api {
            status,
            message: body.chars().take(500).collect(),
        });
    }

    serde_json::from_str(body).map_err(|e| {
        let snippet: String = body.chars().take(500).collect();
        ProviderError::Parse(format!("JSON parse error: {} - Body: {}", e, snippet))
    })
}

// ============================================================================
// Text generation
// ============================================================================

/// A single completion call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system_message: Option<String>,
    pub temperature: f32,
    pub max_tokens: i32,
}

/// Text returned by a provider plus what it reported as used
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub text: String,
    /// Total tokens reported by the provider, 0 when omitted
    pub used_tokens: i32,
    pub model: String,
}

/// Provider trait for hosted LLM APIs
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Routing code (e.g., "claude", "openai")
    fn code(&self) -> &'static str;

    /// Provider display name (e.g., "Anthropic")
    fn name(&self) -> &'static str;

    /// Upstream model identifier sent with each request
    fn model(&self) -> &str;

    /// Whether an API key is present
    fn is_configured(&self) -> bool;

    /// Run a completion
    async fn generate(&self, request: &CompletionRequest) -> ProviderResult<Completion>;
}

// ============================================================================
// Image generation
// ============================================================================

/// A single image generation call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageGenerationRequest {
    /// Prompt already enhanced with style keywords
    pub prompt: String,
    pub size: String,
    /// `standard` or `hd`
    pub quality: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedImage {
    pub image_url: String,
    pub revised_prompt: Option<String>,
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_configured(&self) -> bool;

    async fn generate_image(&self, request: &ImageGenerationRequest) -> ProviderResult<GeneratedImage>;
}

// ============================================================================
// Provider Registry
// ============================================================================

/// Routes model codes to text providers
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Arc<dyn LlmProvider>>,
    default_code: String,
}

impl ProviderRegistry {
    pub fn new(default_code: impl Into<String>) -> Self {
        ProviderRegistry {
            providers: HashMap::new(),
            default_code: default_code.into(),
        }
    }

    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(provider.code(), provider);
    }

    /// Resolve a requested model code.
    ///
    /// Unknown or missing codes fall back to the default provider.
    pub fn resolve(&self, requested: Option<&str>) -> Option<Arc<dyn LlmProvider>> {
        requested
            .and_then(|code| self.providers.get(code.trim().to_lowercase().as_str()))
            .or_else(|| self.providers.get(self.default_code.as_str()))
            .cloned()
    }

    /// Codes of providers with an API key, sorted
    pub fn configured_codes(&self) -> Vec<&'static str> {
        let mut codes: Vec<_> = self.providers
            .values()
            .filter(|p| p.is_configured())
            .map(|p| p.code())
            .collect();
        codes.sort_unstable();
        codes
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Provider returning a canned completion
    pub(crate) struct StaticProvider {
        pub code: &'static str,
        pub configured: bool,
    }

    #[async_trait]
    impl LlmProvider for StaticProvider {
        fn code(&self) -> &'static str { self.code }
        fn name(&self) -> &'static str { "Static" }
        fn model(&self) -> &str { "static-1" }
        fn is_configured(&self) -> bool { self.configured }

        async fn generate(&self, request: &CompletionRequest) -> ProviderResult<Completion> {
            Ok(Completion {
                text: format!("echo: {}", request.prompt),
                used_tokens: 42,
                model: self.model().to_string(),
            })
        }
    }

    fn registry() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new("claude");
        registry.register(Arc::new(StaticProvider { code: "claude", configured: true }));
        registry.register(Arc::new(StaticProvider { code: "openai", configured: false }));
        registry
    }

    #[test]
    fn test_resolve_known_code() {
        let provider = registry().resolve(Some("OpenAI")).unwrap();
        assert_eq!(provider.code(), "openai");
    }

    #[test]
    fn test_unknown_code_falls_back_to_default() {
        let registry = registry();
        assert_eq!(registry.resolve(Some("llama")).unwrap().code(), "claude");
        assert_eq!(registry.resolve(None).unwrap().code(), "claude");
    }

    #[test]
    fn test_configured_codes() {
        assert_eq!(registry().configured_codes(), vec!["claude"]);
    }

    #[test]
    fn test_error_envelope_maps_to_api_error() {
        let body = r#"{"error": {"type": "invalid_request_error", "message": "max_tokens too large"}}"#;
        let result: ProviderResult<serde_json::Value> = parse_response(400, body);
        match result {
            Err(ProviderError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "max_tokens too large");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_error_envelope_on_success_status() {
        let body = r#"{"error": {"code": 402}}"#;
        let result: ProviderResult<serde_json::Value> = parse_response(200, body);
        assert!(matches!(result, Err(ProviderError::Api { message, .. }) if message == "Unknown error"));
    }

    #[test]
    fn test_non_json_failure_keeps_status() {
        let result: ProviderResult<serde_json::Value> = parse_response(503, "upstream down");
        assert!(matches!(result, Err(ProviderError::Api { status: 503, .. })));
    }

    #[test]
    fn test_malformed_success_body_is_parse_error() {
        let result: ProviderResult<Vec<u8>> = parse_response(200, "{}");
        assert!(matches!(result, Err(ProviderError::Parse(_))));
    }

    #[tokio::test]
    async fn test_static_provider_generates() {
        let provider = StaticProvider { code: "claude", configured: true };
        let completion = provider
            .generate(&CompletionRequest {
                prompt: "xin chào".to_string(),
                system_message: None,
                temperature: 0.7,
                max_tokens: 16,
            })
            .await
            .unwrap();
        assert_eq!(completion.text, "echo: xin chào");
    }
}
