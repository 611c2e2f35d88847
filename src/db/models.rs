//! Database models for profiles, content, templates and usage

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::TokenBudget;

/// Subscription tier with associated limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Basic,
    Premium,
    Enterprise,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Basic => "basic",
            SubscriptionTier::Premium => "premium",
            SubscriptionTier::Enterprise => "enterprise",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "basic" => SubscriptionTier::Basic,
            "premium" => SubscriptionTier::Premium,
            "enterprise" => SubscriptionTier::Enterprise,
            _ => SubscriptionTier::Free,
        }
    }

    pub fn default_monthly_token_limit(&self) -> i32 {
        match self {
            SubscriptionTier::Free => 10_000,
            SubscriptionTier::Basic => 100_000,
            SubscriptionTier::Premium => 500_000,
            SubscriptionTier::Enterprise => 2_000_000,
        }
    }

    pub fn default_rate_limit(&self) -> i32 {
        match self {
            SubscriptionTier::Free => 10,
            SubscriptionTier::Basic => 30,
            SubscriptionTier::Premium => 100,
            SubscriptionTier::Enterprise => 1000,
        }
    }
}

/// Lifecycle state of a saved content item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Published => "published",
            ContentStatus::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "published" => ContentStatus::Published,
            "archived" => ContentStatus::Archived,
            _ => ContentStatus::Draft,
        }
    }
}

/// User profile with subscription info and token counters
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub subscription_tier: SubscriptionTier,
    pub subscription_start: Option<DateTime<Utc>>,
    pub subscription_end: Option<DateTime<Utc>>,
    pub monthly_token_limit: i32,
    pub tokens_used: i32,
    pub last_token_reset: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub const COLUMNS: &'static str = "id, username, full_name, avatar_url, subscription_tier, \
        subscription_start, subscription_end, monthly_token_limit, tokens_used, \
        last_token_reset, created_at, updated_at";

    pub fn from_row(row: &Row) -> Self {
        Profile {
            id: row.get("id"),
            username: row.get("username"),
            full_name: row.get("full_name"),
            avatar_url: row.get("avatar_url"),
            subscription_tier: SubscriptionTier::from_str(row.get("subscription_tier")),
            subscription_start: row.get("subscription_start"),
            subscription_end: row.get("subscription_end"),
            monthly_token_limit: row.get("monthly_token_limit"),
            tokens_used: row.get("tokens_used"),
            last_token_reset: row.get("last_token_reset"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    pub fn budget(&self) -> TokenBudget {
        TokenBudget {
            monthly_token_limit: self.monthly_token_limit,
            tokens_used: self.tokens_used,
            last_token_reset: self.last_token_reset,
        }
    }
}

/// Saved generated content
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserContent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub prompt: String,
    pub tokens_used: i32,
    pub status: ContentStatus,
    pub settings: serde_json::Value,
    pub category: Option<String>,
    pub template: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserContent {
    pub const COLUMNS: &'static str = "id, user_id, title, content, prompt, tokens_used, status, \
        settings, category, template, created_at, updated_at";

    pub fn from_row(row: &Row) -> Self {
        UserContent {
            id: row.get("id"),
            user_id: row.get("user_id"),
            title: row.get("title"),
            content: row.get("content"),
            prompt: row.get("prompt"),
            tokens_used: row.get("tokens_used"),
            status: ContentStatus::from_str(row.get("status")),
            settings: row.get("settings"),
            category: row.get("category"),
            template: row.get("template"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

/// New content row written after a successful generation
#[derive(Debug, Clone)]
pub struct NewContent {
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub prompt: String,
    pub tokens_used: i32,
    pub settings: serde_json::Value,
    pub category: Option<String>,
    pub template: Option<String>,
}

/// Partial update of a content item; `None` leaves the column untouched
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ContentUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<ContentStatus>,
    pub category: Option<String>,
    pub template: Option<String>,
    pub settings: Option<serde_json::Value>,
}

/// Tone preset (system-wide or user-owned)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToneTemplate {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub settings: serde_json::Value,
    pub is_system: bool,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ToneTemplate {
    pub const COLUMNS: &'static str =
        "id, name, description, settings, is_system, user_id, created_at, updated_at";

    pub fn from_row(row: &Row) -> Self {
        ToneTemplate {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            settings: row.get("settings"),
            is_system: row.get("is_system"),
            user_id: row.get("user_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

/// Prompt template grouped by category
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContentTemplate {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub prompt_template: String,
    pub settings: Option<serde_json::Value>,
    pub is_system: bool,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentTemplate {
    pub const COLUMNS: &'static str = "id, name, description, category, prompt_template, \
        settings, is_system, user_id, created_at, updated_at";

    pub fn from_row(row: &Row) -> Self {
        ContentTemplate {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            category: row.get("category"),
            prompt_template: row.get("prompt_template"),
            settings: row.get("settings"),
            is_system: row.get("is_system"),
            user_id: row.get("user_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

/// One day of usage for a user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DailyUsage {
    pub date: NaiveDate,
    pub tokens_used: i32,
    pub content_count: i32,
}

/// Lifetime analytics for a user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContentAnalytics {
    pub user_id: Uuid,
    pub full_name: String,
    pub subscription_tier: SubscriptionTier,
    pub monthly_token_limit: i32,
    pub tokens_used: i32,
    pub total_content_count: i64,
    pub total_tokens_used: i64,
    pub avg_tokens_per_content: f64,
    pub first_content_date: Option<DateTime<Utc>>,
    pub last_content_date: Option<DateTime<Utc>>,
}

/// Stored image generation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImageGeneration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub prompt: String,
    pub settings: serde_json::Value,
    pub image_url: String,
    pub revised_prompt: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ImageGeneration {
    pub const COLUMNS: &'static str =
        "id, user_id, prompt, settings, image_url, revised_prompt, created_at";

    pub fn from_row(row: &Row) -> Self {
        ImageGeneration {
            id: row.get("id"),
            user_id: row.get("user_id"),
            prompt: row.get("prompt"),
            settings: row.get("settings"),
            image_url: row.get("image_url"),
            revised_prompt: row.get("revised_prompt"),
            created_at: row.get("created_at"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_parsing_defaults_to_free() {
        assert_eq!(SubscriptionTier::from_str("PREMIUM"), SubscriptionTier::Premium);
        assert_eq!(SubscriptionTier::from_str("platinum"), SubscriptionTier::Free);
    }

    #[test]
    fn test_tier_limits_increase() {
        let tiers = [
            SubscriptionTier::Free,
            SubscriptionTier::Basic,
            SubscriptionTier::Premium,
            SubscriptionTier::Enterprise,
        ];
        for pair in tiers.windows(2) {
            assert!(pair[0].default_monthly_token_limit() < pair[1].default_monthly_token_limit());
            assert!(pair[0].default_rate_limit() < pair[1].default_rate_limit());
        }
    }

    #[test]
    fn test_content_status_round_trip_names() {
        for status in [ContentStatus::Draft, ContentStatus::Published, ContentStatus::Archived] {
            assert_eq!(ContentStatus::from_str(status.as_str()), status);
        }
    }

    #[test]
    fn test_content_update_accepts_partial_body() {
        let update: ContentUpdate = serde_json::from_value(serde_json::json!({
            "status": "published"
        }))
        .unwrap();
        assert_eq!(update.status, Some(ContentStatus::Published));
        assert!(update.title.is_none());
    }
}
