//! OpenAI Chat Completions client
//!
//! The wire types here are shared with the OpenRouter client, which speaks
//! the same protocol.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::ProviderSettings;
use crate::providers::http_client::RateLimitedClient;
use crate::providers::traits::{
    parse_response, Completion, CompletionRequest, LlmProvider, ProviderError, ProviderResult,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4-turbo";

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub max_tokens: i32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

impl<'a> ChatRequest<'a> {
    /// System message first when present, then the user prompt
    pub fn new(model: &'a str, request: &'a CompletionRequest) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_message.as_deref() {
            messages.push(ChatMessage { role: "system", content: system });
        }
        messages.push(ChatMessage { role: "user", content: &request.prompt });

        ChatRequest {
            model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: i32,
}

impl ChatResponse {
    pub fn into_completion(self, fallback_model: &str) -> ProviderResult<Completion> {
        let text = self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Parse("response has no choices".to_string()))?;

        Ok(Completion {
            text,
            used_tokens: self.usage.map(|u| u.total_tokens).unwrap_or(0),
            model: self.model.unwrap_or_else(|| fallback_model.to_string()),
        })
    }
}

/// GPT models via the OpenAI API
pub struct OpenAiProvider {
    client: RateLimitedClient,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(settings: &ProviderSettings, timeout: Duration) -> ProviderResult<Self> {
        Ok(OpenAiProvider {
            client: RateLimitedClient::new(settings.rate_limit_per_minute.unwrap_or(60), timeout)?,
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
            base_url: settings.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: settings.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn code(&self) -> &'static str {
        "openai"
    }

    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, request: &CompletionRequest) -> ProviderResult<Completion> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::NotConfigured("openai"))?;

        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, model = %self.model, "OpenAI request");

        let response = self.client
            .post(&url)
            .bearer_auth(api_key)
            .json(&ChatRequest::new(&self.model, request))
            .send_with_retry(2)
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        parse_response::<ChatResponse>(status, &text)?.into_completion(&self.model)
    }
}
