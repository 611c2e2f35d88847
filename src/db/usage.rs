//! Usage statistics, request logging and rate limiting database operations

use super::models::{ContentAnalytics, DailyUsage, SubscriptionTier};
use super::pool::{DbPool, DbError};
use chrono::{DateTime, NaiveDate, Utc, Timelike};
use tracing::info;
use uuid::Uuid;
use std::net::IpAddr;

/// Log entry for an authenticated API request
#[derive(Debug)]
pub struct RequestLogEntry {
    pub user_id: Uuid,
    pub api_key_id: Uuid,
    pub endpoint: String,
    pub method: String,
    pub status_code: i32,
    pub response_time_ms: Option<i32>,
    pub ip_address: Option<IpAddr>,
    pub user_agent: Option<String>,
}

/// Rate limit check result
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    pub allowed: bool,
    pub current_count: i32,
    pub limit: i32,
    pub reset_at: DateTime<Utc>,
}

/// Repository for usage tracking operations
pub struct UsageRepository {
    pool: DbPool,
}

impl UsageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Record a request in the request log
    pub async fn log_request(&self, entry: RequestLogEntry) -> Result<(), DbError> {
        let client = self.pool.get().await?;

        // Convert IpAddr to string for storage
        let ip_str = entry.ip_address.map(|ip| ip.to_string());

        client.execute(
            r#"
            INSERT INTO request_logs (
                user_id, api_key_id, endpoint, method,
                status_code, response_time_ms, ip_address, user_agent
            ) VALUES ($1, $2, $3, $4, $5, $6, $7::TEXT::inet, $8)
            "#,
            &[
                &entry.user_id,
                &entry.api_key_id,
                &entry.endpoint,
                &entry.method,
                &entry.status_code,
                &entry.response_time_ms,
                &ip_str,
                &entry.user_agent,
            ]
        ).await?;

        Ok(())
    }

    /// Daily usage rows on or after `since`, oldest first
    pub async fn daily_usage_since(
        &self,
        user_id: Uuid,
        since: NaiveDate,
    ) -> Result<Vec<DailyUsage>, DbError> {
        let client = self.pool.get().await?;

        let rows = client.query(
            r#"
            SELECT date, tokens_used, content_count
            FROM usage_statistics
            WHERE user_id = $1 AND date >= $2
            ORDER BY date
            "#,
            &[&user_id, &since]
        ).await?;

        Ok(rows.iter().map(|r| DailyUsage {
            date: r.get("date"),
            tokens_used: r.get("tokens_used"),
            content_count: r.get("content_count"),
        }).collect())
    }

    /// Lifetime content analytics for a user
    pub async fn analytics(&self, user_id: Uuid) -> Result<Option<ContentAnalytics>, DbError> {
        let client = self.pool.get().await?;

        let row = client.query_opt(
            r#"
            SELECT
                p.id AS user_id, p.full_name, p.subscription_tier,
                p.monthly_token_limit, p.tokens_used,
                COUNT(c.id) AS total_content_count,
                COALESCE(SUM(c.tokens_used), 0)::BIGINT AS total_tokens_used,
                COALESCE(AVG(c.tokens_used), 0)::FLOAT8 AS avg_tokens_per_content,
                MIN(c.created_at) AS first_content_date,
                MAX(c.created_at) AS last_content_date
            FROM profiles p
            LEFT JOIN user_content c ON c.user_id = p.id
            WHERE p.id = $1
            GROUP BY p.id
            "#,
            &[&user_id]
        ).await?;

        Ok(row.map(|r| ContentAnalytics {
            user_id: r.get("user_id"),
            full_name: r.get("full_name"),
            subscription_tier: SubscriptionTier::from_str(r.get("subscription_tier")),
            monthly_token_limit: r.get("monthly_token_limit"),
            tokens_used: r.get("tokens_used"),
            total_content_count: r.get("total_content_count"),
            total_tokens_used: r.get("total_tokens_used"),
            avg_tokens_per_content: r.get("avg_tokens_per_content"),
            first_content_date: r.get("first_content_date"),
            last_content_date: r.get("last_content_date"),
        }))
    }

    /// Check rate limit using sliding window in database
    pub async fn check_rate_limit(
        &self,
        api_key_id: Uuid,
        limit: i32
    ) -> Result<RateLimitStatus, DbError> {
        let client = self.pool.get().await?;

        let now = Utc::now();
        let window_start = minute_floor(now);

        let count_row = client.query_one(
            r#"
            SELECT COALESCE(SUM(request_count), 0)::INTEGER as count
            FROM rate_limit_windows
            WHERE api_key_id = $1 AND window_start > NOW() - INTERVAL '1 minute'
            "#,
            &[&api_key_id]
        ).await?;

        let current_count: i32 = count_row.get("count");
        let allowed = current_count < limit;

        if allowed {
            client.execute(
                r#"
                INSERT INTO rate_limit_windows (api_key_id, window_start, request_count)
                VALUES ($1, $2, 1)
                ON CONFLICT (api_key_id, window_start) DO UPDATE
                SET request_count = rate_limit_windows.request_count + 1
                "#,
                &[&api_key_id, &window_start]
            ).await?;
        }

        let reset_at = window_start + chrono::Duration::minutes(1);

        Ok(RateLimitStatus {
            allowed,
            current_count: if allowed { current_count + 1 } else { current_count },
            limit,
            reset_at,
        })
    }

    /// Clean up old rate limit windows (call periodically)
    pub async fn cleanup_rate_limits(&self) -> Result<u64, DbError> {
        let client = self.pool.get().await?;

        let result = client.execute(
            "DELETE FROM rate_limit_windows WHERE window_start < NOW() - INTERVAL '5 minutes'",
            &[]
        ).await?;

        if result > 0 {
            info!(deleted = result, "Cleaned up old rate limit windows");
        }

        Ok(result)
    }

    /// Clean up old request logs (call periodically for data retention)
    pub async fn cleanup_old_logs(&self, retention_days: i32) -> Result<u64, DbError> {
        let client = self.pool.get().await?;

        let result = client.execute(
            "DELETE FROM request_logs WHERE created_at < NOW() - make_interval(days => $1)",
            &[&retention_days]
        ).await?;

        if result > 0 {
            info!(deleted = result, retention_days, "Cleaned up old request logs");
        }

        Ok(result)
    }
}

/// Round down to the start of the minute
fn minute_floor(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_nanosecond(0)
        .and_then(|t| t.with_second(0))
        .unwrap_or(t)
}
