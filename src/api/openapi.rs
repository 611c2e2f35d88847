//! OpenAPI 3.0 specification definition

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{
    auth::{SignupRequest, SignupResponse},
    content::ContentListResponse,
    health::HealthResponse,
    images::ImageListResponse,
    keys::{ApiKeyInfo, CreateKeyRequest, CreateKeyResponse, ListKeysResponse},
    profile::{AllowanceResponse, UpdateProfileRequest},
    templates::{CategoriesResponse, CreateContentTemplateRequest, CreateToneTemplateRequest},
    usage::UsageResponse,
    ErrorResponse,
};
use crate::db::{
    ContentAnalytics, ContentStatus, ContentTemplate, ContentUpdate, DailyUsage, ImageGeneration,
    Profile, SubscriptionTier, ToneTemplate, UserContent,
};
use crate::domain::{
    ContentType, Dialect, GenerationSettings, ImageStyle, TargetLength, Tone, UsagePeriod, VoiceStyle,
};
use crate::engine::{GenerateRequest, GenerationOutcome, ImageOutcome, ImageRequest};

/// Registers the `X-API-Key` header scheme referenced by `security(("api_key" = []))`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "VietVan API",
        version = "1.0.0",
        description = "Vietnamese AI content writing with monthly token budgets",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "/", description = "Current server")
    ),
    tags(
        (name = "system", description = "System health and status endpoints"),
        (name = "auth", description = "Account signup"),
        (name = "generation", description = "Text generation"),
        (name = "images", description = "Image generation"),
        (name = "content", description = "Saved content"),
        (name = "templates", description = "Tone and content templates"),
        (name = "profile", description = "Profile and token allowance"),
        (name = "usage", description = "Usage statistics"),
        (name = "keys", description = "API key management")
    ),
    paths(
        crate::api::handlers::health::health_check,
        crate::api::handlers::auth::signup,
        crate::api::handlers::generate::generate_content,
        crate::api::handlers::images::generate_image,
        crate::api::handlers::images::list_images,
        crate::api::handlers::content::list_content,
        crate::api::handlers::content::get_content,
        crate::api::handlers::content::update_content,
        crate::api::handlers::content::delete_content,
        crate::api::handlers::templates::list_tone_templates,
        crate::api::handlers::templates::create_tone_template,
        crate::api::handlers::templates::delete_tone_template,
        crate::api::handlers::templates::list_content_templates,
        crate::api::handlers::templates::list_categories,
        crate::api::handlers::templates::create_content_template,
        crate::api::handlers::profile::get_profile,
        crate::api::handlers::profile::update_profile,
        crate::api::handlers::profile::check_allowance,
        crate::api::handlers::usage::get_usage,
        crate::api::handlers::usage::get_usage_summary,
        crate::api::handlers::keys::list_keys,
        crate::api::handlers::keys::create_key,
        crate::api::handlers::keys::revoke_key,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            SignupRequest,
            SignupResponse,
            // Generation
            GenerateRequest,
            GenerationOutcome,
            GenerationSettings,
            Tone,
            Dialect,
            VoiceStyle,
            TargetLength,
            ContentType,
            ImageRequest,
            ImageOutcome,
            ImageStyle,
            ImageGeneration,
            ImageListResponse,
            // Content and templates
            UserContent,
            ContentStatus,
            ContentUpdate,
            ContentListResponse,
            ToneTemplate,
            ContentTemplate,
            CreateToneTemplateRequest,
            CreateContentTemplateRequest,
            CategoriesResponse,
            // Profile, usage, keys
            Profile,
            SubscriptionTier,
            UpdateProfileRequest,
            AllowanceResponse,
            UsagePeriod,
            UsageResponse,
            DailyUsage,
            ContentAnalytics,
            CreateKeyRequest,
            CreateKeyResponse,
            ApiKeyInfo,
            ListKeysResponse,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;
