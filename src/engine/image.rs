//! Image generation pipeline

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use super::EngineError;
use crate::db::{ImageRepository, NewImageGeneration};
use crate::domain::{enhance_image_prompt, image_quality, ImageStyle};
use crate::providers::{ImageGenerationRequest, ImageProvider};

/// Sizes accepted by DALL-E 3
pub const SUPPORTED_SIZES: [&str; 3] = ["1024x1024", "1792x1024", "1024x1792"];
const DEFAULT_SIZE: &str = "1024x1024";
const DEFAULT_QUALITY: f64 = 0.5;

/// Body of `POST /api/v1/images/generate`
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ImageRequest {
    pub prompt: String,
    #[serde(default)]
    pub style: ImageStyle,
    pub size: Option<String>,
    /// 0..1 slider; 0.8 and above requests `hd`
    pub quality: Option<f64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImageOutcome {
    pub image_url: String,
    pub revised_prompt: Option<String>,
    /// Missing when the record could not be saved
    pub id: Option<Uuid>,
}

impl ImageRequest {
    pub fn validate(&self, max_prompt_chars: usize) -> Result<ImageGenerationRequest, EngineError> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            return Err(EngineError::InvalidRequest("Prompt must not be empty".to_string()));
        }
        if prompt.chars().count() > max_prompt_chars {
            return Err(EngineError::InvalidRequest(format!(
                "Prompt exceeds {} characters",
                max_prompt_chars
            )));
        }

        let size = self.size.as_deref().unwrap_or(DEFAULT_SIZE);
        if !SUPPORTED_SIZES.contains(&size) {
            return Err(EngineError::InvalidRequest(format!(
                "size must be one of {}",
                SUPPORTED_SIZES.join(", ")
            )));
        }

        Ok(ImageGenerationRequest {
            prompt: enhance_image_prompt(prompt, self.style),
            size: size.to_string(),
            quality: image_quality(self.quality.unwrap_or(DEFAULT_QUALITY)),
        })
    }
}

pub struct ImageEngine {
    images: ImageRepository,
    provider: Arc<dyn ImageProvider>,
    max_prompt_chars: usize,
}

impl ImageEngine {
    pub fn new(images: ImageRepository, provider: Arc<dyn ImageProvider>, max_prompt_chars: usize) -> Self {
        ImageEngine { images, provider, max_prompt_chars }
    }

    pub async fn generate(&self, user_id: Uuid, request: ImageRequest) -> Result<ImageOutcome, EngineError> {
        let provider_request = request.validate(self.max_prompt_chars)?;
        let generated = self.provider.generate_image(&provider_request).await?;

        let record = NewImageGeneration {
            user_id,
            prompt: request.prompt.trim().to_string(),
            settings: serde_json::json!({
                "style": request.style.as_str(),
                "size": provider_request.size,
                "quality": provider_request.quality,
            }),
            image_url: generated.image_url.clone(),
            revised_prompt: generated.revised_prompt.clone(),
        };

        let id = match self.images.insert(&record).await {
            Ok(id) => Some(id),
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Failed to save image generation");
                None
            }
        };

        info!(user_id = %user_id, style = request.style.as_str(), quality = provider_request.quality, "Image generated");

        Ok(ImageOutcome {
            image_url: generated.image_url,
            revised_prompt: generated.revised_prompt,
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 20_000;

    #[test]
    fn test_defaults() {
        let req = ImageRequest { prompt: "ruộng bậc thang".to_string(), ..Default::default() };
        let validated = req.validate(LIMIT).unwrap();
        assert_eq!(validated.size, "1024x1024");
        assert_eq!(validated.quality, "standard");
        assert_eq!(validated.prompt, "A realistic photo of: ruộng bậc thang, detailed, high definition");
    }

    #[test]
    fn test_style_and_quality() {
        let req = ImageRequest {
            prompt: "mèo".to_string(),
            style: ImageStyle::Sketch,
            size: Some("1792x1024".to_string()),
            quality: Some(0.9),
        };
        let validated = req.validate(LIMIT).unwrap();
        assert!(validated.prompt.starts_with("A pencil sketch of: mèo"));
        assert_eq!(validated.quality, "hd");
    }

    #[test]
    fn test_invalid_requests() {
        let blank = ImageRequest { prompt: "  ".to_string(), ..Default::default() };
        assert!(matches!(blank.validate(LIMIT), Err(EngineError::InvalidRequest(_))));

        let bad_size = ImageRequest {
            prompt: "x".to_string(),
            size: Some("512x512".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad_size.validate(LIMIT), Err(EngineError::InvalidRequest(_))));
    }

    #[test]
    fn test_prompt_length_limit_counts_characters() {
        let req = ImageRequest { prompt: "ảnh đẹp".to_string(), ..Default::default() };
        assert!(req.validate(7).is_ok());
        assert!(matches!(req.validate(6), Err(EngineError::InvalidRequest(_))));
    }

    #[test]
    fn test_unknown_style_falls_back_to_realistic() {
        let req: ImageRequest = serde_json::from_str(r#"{"prompt": "x", "style": "watercolor"}"#).unwrap();
        assert_eq!(req.style, ImageStyle::Realistic);
    }
}
