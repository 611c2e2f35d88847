//! Anthropic Messages API client
//!
//! API Docs: https://docs.anthropic.com/en/api/messages

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::ProviderSettings;
use crate::providers::http_client::RateLimitedClient;
use crate::providers::traits::{
    parse_response, Completion, CompletionRequest, LlmProvider, ProviderError, ProviderResult,
};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const DEFAULT_MODEL: &str = "claude-3-opus-20240229";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: i32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: i32,
    #[serde(default)]
    output_tokens: i32,
}

impl MessagesResponse {
    fn into_completion(self, fallback_model: &str) -> ProviderResult<Completion> {
        let text = self.content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .ok_or_else(|| ProviderError::Parse("response has no text content".to_string()))?;
        let usage = self.usage.unwrap_or_default();

        Ok(Completion {
            text,
            used_tokens: usage.input_tokens + usage.output_tokens,
            model: self.model.unwrap_or_else(|| fallback_model.to_string()),
        })
    }
}

/// Claude models via the Anthropic API
pub struct AnthropicProvider {
    client: RateLimitedClient,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(settings: &ProviderSettings, timeout: Duration) -> ProviderResult<Self> {
        Ok(AnthropicProvider {
            client: RateLimitedClient::new(settings.rate_limit_per_minute.unwrap_or(50), timeout)?,
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
            base_url: settings.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: settings.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn code(&self) -> &'static str {
        "claude"
    }

    fn name(&self) -> &'static str {
        "Anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, request: &CompletionRequest) -> ProviderResult<Completion> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::NotConfigured("claude"))?;

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system_message.as_deref(),
            messages: vec![Message { role: "user", content: &request.prompt }],
        };

        let url = format!("{}/messages", self.base_url);
        debug!(url = %url, model = %self.model, "Anthropic request");

        let response = self.client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send_with_retry(2)
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        parse_response::<MessagesResponse>(status, &text)?.into_completion(&self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = MessagesRequest {
            model: DEFAULT_MODEL,
            max_tokens: 1024,
            temperature: 0.7,
            system: Some("Bạn là một nhà văn"),
            messages: vec![Message { role: "user", content: "Viết về Hà Nội" }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "claude-3-opus-20240229");
        assert_eq!(json["system"], "Bạn là một nhà văn");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Viết về Hà Nội");
    }

    #[test]
    fn test_system_omitted_when_absent() {
        let body = MessagesRequest {
            model: DEFAULT_MODEL,
            max_tokens: 10,
            temperature: 0.5,
            system: None,
            messages: vec![],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_parse_completion_sums_usage() {
        let body = r#"{
            "id": "msg_1",
            "model": "claude-3-opus-20240229",
            "content": [{"type": "text", "text": "Xin chào"}],
            "usage": {"input_tokens": 12, "output_tokens": 30}
        }"#;
        let completion = parse_response::<MessagesResponse>(200, body)
            .unwrap()
            .into_completion("fallback")
            .unwrap();
        assert_eq!(completion.text, "Xin chào");
        assert_eq!(completion.used_tokens, 42);
        assert_eq!(completion.model, "claude-3-opus-20240229");
    }

    #[test]
    fn test_missing_usage_reports_zero() {
        let body = r#"{"content": [{"type": "text", "text": "ok"}]}"#;
        let completion = parse_response::<MessagesResponse>(200, body)
            .unwrap()
            .into_completion("claude-x")
            .unwrap();
        assert_eq!(completion.used_tokens, 0);
        assert_eq!(completion.model, "claude-x");
    }

    #[test]
    fn test_empty_content_is_parse_error() {
        let body = r#"{"content": []}"#;
        let result = parse_response::<MessagesResponse>(200, body)
            .unwrap()
            .into_completion("claude-x");
        assert!(matches!(result, Err(ProviderError::Parse(_))));
    }

    #[tokio::test]
    async fn test_unconfigured_key_fails_fast() {
        let provider = AnthropicProvider::new(&ProviderSettings::default(), Duration::from_secs(5)).unwrap();
        assert!(!provider.is_configured());
        let result = provider
            .generate(&CompletionRequest {
                prompt: "hi".to_string(),
                system_message: None,
                temperature: 0.7,
                max_tokens: 10,
            })
            .await;
        assert!(matches!(result, Err(ProviderError::NotConfigured("claude"))));
    }
}
