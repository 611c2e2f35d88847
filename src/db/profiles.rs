//! Profile storage and token budget bookkeeping

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use super::api_keys::{insert_api_key, CreateApiKeyRequest, CreateApiKeyResponse};
use super::models::{NewContent, Profile, SubscriptionTier};
use super::pool::{DbError, DbPool};
use crate::domain::{refund_adjustment, settle_adjustment, usage_day, AllowanceDecision};

/// Request to create a new profile
#[derive(Debug)]
pub struct CreateProfileRequest {
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub tier: SubscriptionTier,
}

/// Editable profile fields; `None` keeps the stored value
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Tokens provisionally charged to a profile before a provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub user_id: Uuid,
    pub reserved: i32,
    /// `last_token_reset` of the profile when the tokens were reserved
    pub period_start: DateTime<Utc>,
}

impl Reservation {
    /// Whether the counter has not been reset since the reservation
    pub fn in_period(&self, last_token_reset: DateTime<Utc>) -> bool {
        last_token_reset <= self.period_start
    }
}

/// Result of trying to reserve tokens
#[derive(Debug, Clone)]
pub enum ReserveOutcome {
    Reserved(Reservation, AllowanceDecision),
    Denied(AllowanceDecision),
}

/// Everything written once a generation succeeded
#[derive(Debug, Clone)]
pub struct Settlement {
    pub reservation: Reservation,
    pub charged: i32,
    pub content: NewContent,
}

/// Reserve, settle and refund steps of a generation's token bookkeeping
#[async_trait]
pub trait TokenLedger: Send + Sync {
    /// Reserve `estimate` tokens, or report why the allowance refuses them
    async fn reserve_tokens(&self, user_id: Uuid, estimate: i32) -> Result<ReserveOutcome, DbError>;

    /// Book the charged tokens and save the content; returns the content id
    async fn settle(&self, settlement: Settlement) -> Result<Uuid, DbError>;

    /// Give back a reservation whose generation failed
    async fn refund(&self, reservation: Reservation) -> Result<(), DbError>;
}

/// Repository for profile operations
pub struct ProfileRepository {
    pool: DbPool,
}

impl ProfileRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a profile with the tier's default monthly allowance and its
    /// first API key.
    ///
    /// Both rows are written in one transaction. A username claimed by a
    /// concurrent signup comes back as [`DbError::Conflict`].
    pub async fn create_with_first_key(
        &self,
        request: CreateProfileRequest,
        key_name: String,
    ) -> Result<(Profile, CreateApiKeyResponse), DbError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let sql = format!(
            r#"
            INSERT INTO profiles (
                username, full_name, avatar_url, subscription_tier,
                subscription_start, monthly_token_limit
            ) VALUES ($1, $2, $3, $4, NOW(), $5)
            RETURNING {}
            "#,
            Profile::COLUMNS
        );

        let row = tx.query_one(
            &sql,
            &[
                &request.username,
                &request.full_name,
                &request.avatar_url,
                &request.tier.as_str(),
                &request.tier.default_monthly_token_limit(),
            ]
        ).await.map_err(|e| DbError::conflict_on_unique(e, "Username is already taken"))?;
        let profile = Profile::from_row(&row);

        let key = insert_api_key(&tx, CreateApiKeyRequest {
            user_id: profile.id,
            name: key_name,
            tier: request.tier,
            rate_limit_per_minute: None,
            expires_at: None,
        }).await?;

        tx.commit().await?;

        info!(user_id = %profile.id, tier = %request.tier.as_str(), "Created profile");
        Ok((profile, key))
    }

    pub async fn get(&self, user_id: Uuid) -> Result<Option<Profile>, DbError> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {} FROM profiles WHERE id = $1", Profile::COLUMNS);
        let row = client.query_opt(&sql, &[&user_id]).await?;
        Ok(row.as_ref().map(Profile::from_row))
    }

    pub async fn username_taken(&self, username: &str) -> Result<bool, DbError> {
        let client = self.pool.get().await?;
        let row = client.query_one(
            "SELECT EXISTS (SELECT 1 FROM profiles WHERE lower(username) = lower($1)) AS taken",
            &[&username]
        ).await?;
        Ok(row.get("taken"))
    }

    /// Update editable fields and bump `updated_at`
    pub async fn update(&self, user_id: Uuid, update: ProfileUpdate) -> Result<Option<Profile>, DbError> {
        let client = self.pool.get().await?;

        let sql = format!(
            r#"
            UPDATE profiles SET
                username = COALESCE($2, username),
                full_name = COALESCE($3, full_name),
                avatar_url = COALESCE($4, avatar_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            Profile::COLUMNS
        );

        let row = client.query_opt(
            &sql,
            &[&user_id, &update.username, &update.full_name, &update.avatar_url]
        ).await.map_err(|e| DbError::conflict_on_unique(e, "Username is already taken"))?;

        Ok(row.as_ref().map(Profile::from_row))
    }

    /// Evaluate the allowance without reserving anything, applying the
    /// monthly reset when it is due.
    pub async fn check_allowance(
        &self,
        user_id: Uuid,
        estimate: i32,
    ) -> Result<AllowanceDecision, DbError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let profile = lock_profile(&tx, user_id).await?;
        let now = Utc::now();
        let decision = profile.budget().evaluate(now, estimate);
        if decision.reset {
            apply_reset(&tx, user_id, now).await?;
        }

        tx.commit().await?;
        Ok(decision)
    }
}

#[async_trait]
impl TokenLedger for ProfileRepository {
    /// The profile row stays locked between the allowance check and the
    /// increment, so concurrent submits by one user serialize here.
    async fn reserve_tokens(&self, user_id: Uuid, estimate: i32) -> Result<ReserveOutcome, DbError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let profile = lock_profile(&tx, user_id).await?;
        let now = Utc::now();
        let decision = profile.budget().evaluate(now, estimate);

        let period_start = if decision.reset {
            let reset_at = apply_reset(&tx, user_id, now).await?;
            info!(user_id = %user_id, "Monthly token counter reset");
            reset_at
        } else {
            profile.last_token_reset
        };

        if !decision.allowed {
            tx.commit().await?;
            warn!(
                user_id = %user_id,
                estimate,
                available = decision.available,
                "Token allowance exceeded"
            );
            return Ok(ReserveOutcome::Denied(decision));
        }

        tx.execute(
            "UPDATE profiles SET tokens_used = tokens_used + $2 WHERE id = $1",
            &[&user_id, &estimate]
        ).await?;
        tx.commit().await?;

        Ok(ReserveOutcome::Reserved(
            Reservation { user_id, reserved: estimate, period_start },
            decision,
        ))
    }

    /// Correct the counter to the charged amount, bump today's statistics
    /// row and save the content, all in one transaction.
    async fn settle(&self, settlement: Settlement) -> Result<Uuid, DbError> {
        let Settlement { reservation, charged, content } = settlement;
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let profile = lock_profile(&tx, reservation.user_id).await?;
        let same_period = reservation.in_period(profile.last_token_reset);
        let adjustment = settle_adjustment(same_period, reservation.reserved, charged);
        tx.execute(
            r#"
            UPDATE profiles
            SET tokens_used = GREATEST(tokens_used + $2, 0), updated_at = NOW()
            WHERE id = $1
            "#,
            &[&reservation.user_id, &adjustment]
        ).await?;

        let today = usage_day(Utc::now());
        tx.execute(
            r#"
            INSERT INTO usage_statistics (user_id, date, tokens_used, content_count)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (user_id, date) DO UPDATE SET
                tokens_used = usage_statistics.tokens_used + EXCLUDED.tokens_used,
                content_count = usage_statistics.content_count + 1
            "#,
            &[&reservation.user_id, &today, &charged]
        ).await?;

        let row = tx.query_one(
            r#"
            INSERT INTO user_content (
                user_id, title, content, prompt, tokens_used, settings, category, template
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
            &[
                &content.user_id,
                &content.title,
                &content.content,
                &content.prompt,
                &content.tokens_used,
                &content.settings,
                &content.category,
                &content.template,
            ]
        ).await?;

        tx.commit().await?;

        let content_id: Uuid = row.get("id");
        info!(
            user_id = %reservation.user_id,
            content_id = %content_id,
            reserved = reservation.reserved,
            charged,
            same_period,
            "Token usage settled"
        );
        Ok(content_id)
    }

    async fn refund(&self, reservation: Reservation) -> Result<(), DbError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let profile = lock_profile(&tx, reservation.user_id).await?;
        let adjustment = refund_adjustment(
            reservation.in_period(profile.last_token_reset),
            reservation.reserved,
        );
        if adjustment == 0 {
            tx.commit().await?;
            info!(user_id = %reservation.user_id, "Counter reset since reservation, nothing to refund");
            return Ok(());
        }

        tx.execute(
            "UPDATE profiles SET tokens_used = GREATEST(tokens_used + $2, 0) WHERE id = $1",
            &[&reservation.user_id, &adjustment]
        ).await?;
        tx.commit().await?;

        info!(user_id = %reservation.user_id, refunded = reservation.reserved, "Token reservation refunded");
        Ok(())
    }
}

async fn lock_profile(tx: &deadpool_postgres::Transaction<'_>, user_id: Uuid) -> Result<Profile, DbError> {
    let sql = format!("SELECT {} FROM profiles WHERE id = $1 FOR UPDATE", Profile::COLUMNS);
    let row = tx.query_opt(&sql, &[&user_id]).await?
        .ok_or_else(|| DbError::NotFound(format!("profile {}", user_id)))?;
    Ok(Profile::from_row(&row))
}

/// Zero the monthly counter; returns the stored reset timestamp
async fn apply_reset(
    tx: &deadpool_postgres::Transaction<'_>,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, DbError> {
    let row = tx.query_one(
        r#"
        UPDATE profiles SET tokens_used = 0, last_token_reset = $2
        WHERE id = $1
        RETURNING last_token_reset
        "#,
        &[&user_id, &now]
    ).await?;
    Ok(row.get("last_token_reset"))
}

/// Merge request parameters into the settings blob stored with content
pub fn settings_json(model: &str, temperature: f32, max_tokens: i32, style: Value) -> Value {
    let mut settings = serde_json::json!({
        "model": model,
        "temperature": temperature,
        "max_tokens": max_tokens,
    });
    if let (Some(target), Value::Object(extra)) = (settings.as_object_mut(), style) {
        for (key, value) in extra {
            target.entry(key).or_insert(value);
        }
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_settings_json_merges_style() {
        let settings = settings_json(
            "openai",
            0.5,
            512,
            serde_json::json!({ "tone": "friendly", "seoOptimize": true }),
        );
        assert_eq!(settings["model"], "openai");
        assert_eq!(settings["max_tokens"], 512);
        assert_eq!(settings["tone"], "friendly");
        assert_eq!(settings["seoOptimize"], true);
    }

    #[test]
    fn test_reservation_period_tracks_reset() {
        let reserved_at = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        let reservation = Reservation { user_id: Uuid::nil(), reserved: 1100, period_start: reserved_at };

        assert!(reservation.in_period(reserved_at));
        assert!(!reservation.in_period(Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 1).unwrap()));
    }

    #[test]
    fn test_settings_json_keeps_request_fields() {
        let settings = settings_json("claude", 0.7, 1024, serde_json::json!({ "model": "other" }));
        assert_eq!(settings["model"], "claude");
    }
}
