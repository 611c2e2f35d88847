//! OpenRouter client, used to reach Gemini models
//!
//! OpenRouter speaks the OpenAI chat protocol and asks callers to identify
//! themselves with `HTTP-Referer` and `X-Title`.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::config::ProviderSettings;
use crate::providers::http_client::RateLimitedClient;
use crate::providers::openai::{ChatRequest, ChatResponse};
use crate::providers::traits::{
    parse_response, Completion, CompletionRequest, LlmProvider, ProviderError, ProviderResult,
};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "google/gemini-2.5-pro-preview";
const APP_TITLE: &str = "VietVan AI Content Generator";
const TOP_P: f32 = 0.9;

pub struct OpenRouterProvider {
    client: RateLimitedClient,
    api_key: Option<String>,
    base_url: String,
    model: String,
    referer: String,
}

impl OpenRouterProvider {
    /// `referer` is sent as `HTTP-Referer`; usually the public site URL
    pub fn new(settings: &ProviderSettings, referer: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        Ok(OpenRouterProvider {
            client: RateLimitedClient::new(settings.rate_limit_per_minute.unwrap_or(60), timeout)?,
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
            base_url: settings.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: settings.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            referer: referer.into(),
        })
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        let mut body = ChatRequest::new(&self.model, request);
        body.top_p = Some(TOP_P);
        body
    }
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    fn code(&self) -> &'static str {
        "gemini"
    }

    fn name(&self) -> &'static str {
        "OpenRouter"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, request: &CompletionRequest) -> ProviderResult<Completion> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::NotConfigured("gemini"))?;

        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, model = %self.model, "OpenRouter request");

        let response = self.client
            .post(&url)
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", APP_TITLE)
            .json(&self.body(request))
            .send_with_retry(2)
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        parse_response::<ChatResponse>(status, &text)?.into_completion(&self.model)
    }
}
