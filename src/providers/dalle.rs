//! DALL-E 3 image generation via the OpenAI Images API

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::ProviderSettings;
use crate::providers::http_client::RateLimitedClient;
use crate::providers::traits::{
    parse_response, GeneratedImage, ImageGenerationRequest, ImageProvider, ProviderError,
    ProviderResult,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "dall-e-3";

#[derive(Debug, Serialize)]
struct ImagesRequest<'a> {
    prompt: &'a str,
    n: u8,
    size: &'a str,
    quality: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    revised_prompt: Option<String>,
}

impl ImagesResponse {
    fn into_image(self) -> ProviderResult<GeneratedImage> {
        let first = self.data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Parse("response has no images".to_string()))?;
        let image_url = first.url
            .ok_or_else(|| ProviderError::Parse("image has no url".to_string()))?;

        Ok(GeneratedImage {
            image_url,
            revised_prompt: first.revised_prompt,
        })
    }
}

pub struct DalleProvider {
    client: RateLimitedClient,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl DalleProvider {
    pub fn new(settings: &ProviderSettings, timeout: Duration) -> ProviderResult<Self> {
        Ok(DalleProvider {
            client: RateLimitedClient::new(settings.rate_limit_per_minute.unwrap_or(5), timeout)?,
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
            base_url: settings.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: settings.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

#[async_trait]
impl ImageProvider for DalleProvider {
    fn name(&self) -> &'static str {
        "DALL-E"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate_image(&self, request: &ImageGenerationRequest) -> ProviderResult<GeneratedImage> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::NotConfigured("dalle"))?;

        let body = ImagesRequest {
            prompt: &request.prompt,
            n: 1,
            size: &request.size,
            quality: request.quality,
            model: &self.model,
        };

        let url = format!("{}/images/generations", self.base_url);
        debug!(url = %url, size = %request.size, quality = request.quality, "Image generation request");

        let response = self.client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send_with_retry(1)
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        parse_response::<ImagesResponse>(status, &text)?.into_image()
    }
}
