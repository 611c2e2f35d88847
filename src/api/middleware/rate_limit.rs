//! Per-key request rate limiting
//!
//! Counters live in the `rate_limit_windows` table, one row per key and
//! minute. This module turns a [`RateLimitStatus`] into response headers.

use actix_web::{
    http::header::{HeaderMap, HeaderName, HeaderValue},
    HttpResponse,
};
use chrono::Utc;

use crate::db::RateLimitStatus;

pub const RATE_LIMIT_LIMIT: &str = "X-RateLimit-Limit";
pub const RATE_LIMIT_REMAINING: &str = "X-RateLimit-Remaining";
pub const RATE_LIMIT_RESET: &str = "X-RateLimit-Reset";
pub const RETRY_AFTER: &str = "Retry-After";

/// Requests left in the current window
pub fn remaining(status: &RateLimitStatus) -> i32 {
    (status.limit - status.current_count).max(0)
}

/// Add `X-RateLimit-*` headers to a response
pub fn add_rate_limit_headers(headers: &mut HeaderMap, status: &RateLimitStatus) {
    headers.insert(HeaderName::from_static("x-ratelimit-limit"), HeaderValue::from(status.limit));
    headers.insert(HeaderName::from_static("x-ratelimit-remaining"), HeaderValue::from(remaining(status)));
    headers.insert(HeaderName::from_static("x-ratelimit-reset"), HeaderValue::from(status.reset_at.timestamp()));
}

/// 429 with limit headers and `Retry-After`
pub fn rate_limit_exceeded_response(status: &RateLimitStatus) -> HttpResponse {
    let seconds_until_reset = (status.reset_at - Utc::now()).num_seconds().max(1);

    HttpResponse::TooManyRequests()
        .insert_header((RATE_LIMIT_LIMIT, status.limit.to_string()))
        .insert_header((RATE_LIMIT_REMAINING, "0"))
        .insert_header((RATE_LIMIT_RESET, status.reset_at.timestamp().to_string()))
        .insert_header((RETRY_AFTER, seconds_until_reset.to_string()))
        .json(serde_json::json!({
            "error": "rate_limit_exceeded",
            "message": format!("Rate limit exceeded. Maximum {} requests per minute.", status.limit),
            "limit": status.limit,
            "reset_at": status.reset_at.to_rfc3339(),
            "retry_after_seconds": seconds_until_reset
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn status(current: i32, limit: i32) -> RateLimitStatus {
        RateLimitStatus {
            allowed: current <= limit,
            current_count: current,
            limit,
            reset_at: Utc::now() + Duration::seconds(30),
        }
    }

    #[test]
    fn test_headers() {
        let mut headers = HeaderMap::new();
        add_rate_limit_headers(&mut headers, &status(3, 10));
        assert_eq!(headers.get(RATE_LIMIT_LIMIT).unwrap(), "10");
        assert_eq!(headers.get(RATE_LIMIT_REMAINING).unwrap(), "7");
        assert!(headers.contains_key(RATE_LIMIT_RESET));
    }

    #[test]
    fn test_remaining_never_negative() {
        assert_eq!(remaining(&status(12, 10)), 0);
    }

    #[test]
    fn test_exceeded_response() {
        let response = rate_limit_exceeded_response(&status(11, 10));
        assert_eq!(response.status(), actix_web::http::StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(RATE_LIMIT_REMAINING).unwrap(), "0");
        let retry: i64 = response.headers().get(RETRY_AFTER).unwrap().to_str().unwrap().parse().unwrap();
        assert!((1..=30).contains(&retry));
    }
}
