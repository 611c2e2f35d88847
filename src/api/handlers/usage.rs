//! Usage statistics endpoints

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{db_error_response, not_found, require_auth, require_db, ErrorResponse};
use crate::db::{ContentAnalytics, DailyUsage, UsageRepository};
use crate::domain::{usage_day, UsagePeriod};
use crate::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct UsageQuery {
    /// `day`, `week`, `month` (default) or `year`
    #[serde(default)]
    pub period: UsagePeriod,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UsageResponse {
    pub period: UsagePeriod,
    pub since: NaiveDate,
    pub total_tokens: i64,
    pub total_content: i64,
    pub daily: Vec<DailyUsage>,
}

impl UsageResponse {
    fn new(period: UsagePeriod, since: NaiveDate, daily: Vec<DailyUsage>) -> Self {
        let total_tokens = daily.iter().map(|d| i64::from(d.tokens_used)).sum();
        let total_content = daily.iter().map(|d| i64::from(d.content_count)).sum();
        UsageResponse { period, since, total_tokens, total_content, daily }
    }
}

/// GET /api/v1/usage
#[utoipa::path(
    get,
    path = "/api/v1/usage",
    tag = "usage",
    params(UsageQuery),
    responses((status = 200, description = "Daily usage in the period, oldest first", body = UsageResponse)),
    security(("api_key" = []))
)]
pub async fn get_usage(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<UsageQuery>,
) -> HttpResponse {
    let auth = match require_auth(&req) {
        Ok(auth) => auth,
        Err(response) => return response,
    };
    let pool = match require_db(&state) {
        Ok(pool) => pool,
        Err(response) => return response,
    };

    let since = query.period.start_date(usage_day(Utc::now()));
    match UsageRepository::new(pool).daily_usage_since(auth.user_id, since).await {
        Ok(daily) => HttpResponse::Ok().json(UsageResponse::new(query.period, since, daily)),
        Err(e) => db_error_response(&e, "load usage"),
    }
}

/// GET /api/v1/usage/summary
#[utoipa::path(
    get,
    path = "/api/v1/usage/summary",
    tag = "usage",
    responses(
        (status = 200, description = "Lifetime content analytics", body = ContentAnalytics),
        (status = 404, description = "Profile missing", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn get_usage_summary(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let auth = match require_auth(&req) {
        Ok(auth) => auth,
        Err(response) => return response,
    };
    let pool = match require_db(&state) {
        Ok(pool) => pool,
        Err(response) => return response,
    };

    match UsageRepository::new(pool).analytics(auth.user_id).await {
        Ok(Some(summary)) => HttpResponse::Ok().json(summary),
        Ok(None) => not_found("Profile not found"),
        Err(e) => db_error_response(&e, "load usage summary"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals() {
        let day = |d: u32, tokens: i32, count: i32| DailyUsage {
            date: NaiveDate::from_ymd_opt(2025, 3, d).unwrap(),
            tokens_used: tokens,
            content_count: count,
        };
        let response = UsageResponse::new(
            UsagePeriod::Week,
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            vec![day(2, 1200, 2), day(3, 800, 1)],
        );
        assert_eq!(response.total_tokens, 2000);
        assert_eq!(response.total_content, 3);
    }

    #[test]
    fn test_period_defaults_to_month() {
        let query: UsageQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.period, UsagePeriod::Month);
    }
}
