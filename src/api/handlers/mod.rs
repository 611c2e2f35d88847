//! HTTP request handlers

pub mod health;
pub mod auth;
pub mod generate;
pub mod images;
pub mod content;
pub mod templates;
pub mod profile;
pub mod usage;
pub mod keys;

use actix_web::{http::StatusCode, HttpRequest, HttpResponse};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::api::middleware::{ApiKeyAuth, ApiKeyExt};
use crate::db::{DbError, DbPool};
use crate::engine::EngineError;
use crate::providers::ProviderError;
use crate::AppState;

/// Error body returned by every endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

pub(crate) fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: code.to_string(),
        message: message.into(),
    })
}

pub(crate) fn not_found(message: impl Into<String>) -> HttpResponse {
    error_response(StatusCode::NOT_FOUND, "not_found", message)
}

pub(crate) fn bad_request(message: impl Into<String>) -> HttpResponse {
    error_response(StatusCode::BAD_REQUEST, "invalid_request", message)
}

pub(crate) fn username_taken() -> HttpResponse {
    error_response(StatusCode::CONFLICT, "username_taken", "Username is already taken")
}

/// Caller identity set by the API middleware
pub(crate) fn require_auth(req: &HttpRequest) -> Result<ApiKeyAuth, HttpResponse> {
    req.api_key()
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "unauthorized", "API key required"))
}

pub(crate) fn require_db(state: &AppState) -> Result<DbPool, HttpResponse> {
    state.db_pool
        .clone()
        .ok_or_else(|| error_response(StatusCode::SERVICE_UNAVAILABLE, "database_unavailable", "Database not configured"))
}

/// Log a database failure and hide its details from the caller
pub(crate) fn db_error_response(e: &DbError, action: &str) -> HttpResponse {
    match e {
        DbError::NotFound(what) => not_found(format!("{} not found", what)),
        DbError::Conflict(message) => error_response(StatusCode::CONFLICT, "conflict", message.clone()),
        DbError::PoolGet(_) | DbError::Pool(_) => {
            error!(error = %e, action, "Database unavailable");
            error_response(StatusCode::SERVICE_UNAVAILABLE, "database_unavailable", "Database unavailable")
        }
        _ => {
            error!(error = %e, action, "Database error");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", format!("Failed to {}", action))
        }
    }
}

pub(crate) fn engine_error_response(e: &EngineError) -> HttpResponse {
    match e {
        EngineError::InvalidRequest(message) => bad_request(message.clone()),
        EngineError::TokenLimitExceeded(decision) => HttpResponse::Forbidden().json(serde_json::json!({
            "error": "token_limit_exceeded",
            "message": e.to_string(),
            "available_tokens": decision.available,
            "monthly_token_limit": decision.monthly_token_limit,
        })),
        EngineError::NoProvider => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "provider_unavailable",
            "No model provider configured",
        ),
        EngineError::Provider(ProviderError::NotConfigured(code)) => {
            warn!(model = code, "Provider API key missing");
            error_response(StatusCode::BAD_GATEWAY, "provider_error", "API key not configured")
        }
        EngineError::Provider(ProviderError::RateLimited { retry_after_secs }) => {
            HttpResponse::TooManyRequests()
                .insert_header(("Retry-After", retry_after_secs.to_string()))
                .json(ErrorResponse {
                    error: "provider_rate_limited".to_string(),
                    message: e.to_string(),
                })
        }
        EngineError::Provider(provider_error) => {
            error_response(StatusCode::BAD_GATEWAY, "provider_error", provider_error.to_string())
        }
        EngineError::Database(db_error) => db_error_response(db_error, "save generation"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AllowanceDecision;

    #[test]
    fn test_token_limit_maps_to_forbidden() {
        let response = engine_error_response(&EngineError::TokenLimitExceeded(AllowanceDecision {
            reset: false,
            tokens_used: 9_990,
            monthly_token_limit: 10_000,
            available: 10,
            allowed: false,
        }));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_provider_errors_map_to_bad_gateway() {
        let response = engine_error_response(&EngineError::Provider(ProviderError::Api {
            status: 500,
            message: "overloaded".to_string(),
        }));
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = engine_error_response(&EngineError::Provider(ProviderError::NotConfigured("openai")));
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_provider_throttling_keeps_retry_after() {
        let response = engine_error_response(&EngineError::Provider(ProviderError::RateLimited {
            retry_after_secs: 12,
        }));
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("Retry-After").unwrap(), "12");
    }

    #[test]
    fn test_invalid_request_is_bad_request() {
        let response = engine_error_response(&EngineError::InvalidRequest("empty".to_string()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_missing_row_is_not_found() {
        let response = db_error_response(&DbError::NotFound("profile".to_string()), "load profile");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let response = db_error_response(&DbError::Conflict("Username is already taken".to_string()), "create profile");
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
