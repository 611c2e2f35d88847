//! Database module for PostgreSQL connectivity
//!
//! Connection pool management plus one repository per table group:
//! profiles and token budgets, saved content, templates, usage statistics,
//! API keys and image generations.

pub mod pool;
pub mod models;
pub mod profiles;
pub mod content;
pub mod templates;
pub mod usage;
pub mod api_keys;
pub mod images;

pub use pool::{DbPool, DbError};
pub use models::{
    ContentAnalytics, ContentStatus, ContentTemplate, ContentUpdate, DailyUsage,
    ImageGeneration, NewContent, Profile, SubscriptionTier, ToneTemplate, UserContent,
};
pub use profiles::{
    settings_json, CreateProfileRequest, ProfileRepository, ProfileUpdate, Reservation,
    ReserveOutcome, Settlement, TokenLedger,
};
pub use content::{ContentFilter, ContentRepository};
pub use templates::{NewContentTemplate, NewToneTemplate, TemplateRepository};
pub use usage::{RateLimitStatus, RequestLogEntry, UsageRepository};
pub use api_keys::{ApiKeyRepository, CreateApiKeyRequest, CreateApiKeyResponse, DbApiKey};
pub use images::{ImageRepository, NewImageGeneration};
