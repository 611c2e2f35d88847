//! API middleware
//!
//! Authentication, per-key rate limiting and request logging for the
//! VietVan API, combined into [`ApiMiddleware`].

pub mod auth;
pub mod rate_limit;
pub mod request_log;
pub mod service;

pub use auth::{extract_api_key, validate_api_key, ApiKeyAuth, ApiKeyExt, AuthFailure, API_KEY_HEADER};
pub use rate_limit::{
    add_rate_limit_headers, rate_limit_exceeded_response, RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING,
    RATE_LIMIT_RESET, RETRY_AFTER,
};
pub use request_log::{extract_client_ip, extract_user_agent, spawn_request_log};
pub use service::ApiMiddleware;
