//! Hosted model provider integrations
//!
//! ```text
//!                    ┌─────────────────────┐
//!                    │  ProviderRegistry   │
//!                    └──────────┬──────────┘
//!                               │ model code
//!          ┌────────────────────┼────────────────────┐
//!          │                    │                    │
//!     ┌────┴─────┐        ┌─────┴────┐        ┌──────┴─────┐
//!     │  claude  │        │  openai  │        │   gemini   │
//!     │Anthropic │        │  OpenAI  │        │ OpenRouter │
//!     └──────────┘        └──────────┘        └────────────┘
//! ```
//!
//! Images go through a single [`ImageProvider`] (DALL-E 3).

pub mod traits;
pub mod http_client;
pub mod anthropic;
pub mod openai;
pub mod openrouter;
pub mod dalle;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;

pub use traits::{
    Completion,
    CompletionRequest,
    GeneratedImage,
    ImageGenerationRequest,
    ImageProvider,
    LlmProvider,
    ProviderError,
    ProviderRegistry,
    ProviderResult,
};
pub use http_client::RateLimitedClient;
pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use openrouter::OpenRouterProvider;
pub use dalle::DalleProvider;

/// Build the text registry and the image provider from settings
pub fn build_providers(settings: &Settings) -> ProviderResult<(ProviderRegistry, Arc<dyn ImageProvider>)> {
    let providers = &settings.providers;
    let timeout = Duration::from_secs(settings.generation.request_timeout_secs);

    let mut registry = ProviderRegistry::new(settings.generation.default_model.clone());
    registry.register(Arc::new(AnthropicProvider::new(&providers.anthropic, timeout)?));
    registry.register(Arc::new(OpenAiProvider::new(&providers.openai, timeout)?));
    registry.register(Arc::new(OpenRouterProvider::new(
        &providers.openrouter,
        settings.server.public_url.clone(),
        timeout,
    )?));

    let images: Arc<dyn ImageProvider> = Arc::new(DalleProvider::new(&providers.images, timeout)?);

    Ok((registry, images))
}
