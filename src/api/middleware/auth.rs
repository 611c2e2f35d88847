//! API key authentication
//!
//! Keys are read from `X-API-Key`, the `apikey` header browser clients send,
//! or `Authorization: Bearer <key>`. The authenticated key is stored in the
//! request extensions for handlers.

use actix_web::{dev::ServiceRequest, http::header::AUTHORIZATION, HttpMessage};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::{ApiKeyRepository, DbApiKey, SubscriptionTier};

/// Header name for API key
pub const API_KEY_HEADER: &str = "X-API-Key";
/// Header used by browser clients of the original web app
pub const APIKEY_HEADER: &str = "apikey";

/// Why a presented key was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    Invalid,
    Inactive,
    Backend,
}

impl AuthFailure {
    pub fn message(&self) -> &'static str {
        match self {
            AuthFailure::Invalid => "Invalid API key",
            AuthFailure::Inactive => "API key is inactive or expired",
            AuthFailure::Backend => "Database unavailable",
        }
    }
}

/// Extract API key from request headers
pub fn extract_api_key(req: &ServiceRequest) -> Option<String> {
    for name in [API_KEY_HEADER, APIKEY_HEADER] {
        if let Some(key) = req.headers().get(name).and_then(|v| v.to_str().ok()) {
            let key = key.trim();
            if !key.is_empty() {
                return Some(key.to_string());
            }
        }
    }

    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

/// Look the key up and check it is usable
pub async fn validate_api_key(api_key: &str, repo: &ApiKeyRepository) -> Result<DbApiKey, AuthFailure> {
    match repo.validate(api_key).await {
        Ok(Some(key)) if key.is_valid() => {
            let key_id = key.id;
            let pool = repo.pool.clone();
            tokio::spawn(async move {
                if let Err(e) = ApiKeyRepository::new(pool).touch(key_id).await {
                    debug!(key_id = %key_id, error = %e, "Failed to update last_used_at");
                }
            });

            debug!(key_id = %key.id, user_id = %key.user_id, tier = key.tier.as_str(), "API key validated");
            Ok(key)
        }
        Ok(Some(key)) => {
            warn!(key_id = %key.id, "API key is inactive or expired");
            Err(AuthFailure::Inactive)
        }
        Ok(None) => {
            warn!("API key not found");
            Err(AuthFailure::Invalid)
        }
        Err(e) => {
            warn!(error = %e, "Failed to validate API key");
            Err(AuthFailure::Backend)
        }
    }
}

/// Authenticated caller, available to handlers
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    pub key_id: Uuid,
    pub user_id: Uuid,
    pub tier: SubscriptionTier,
    pub rate_limit: i32,
}

impl From<&DbApiKey> for ApiKeyAuth {
    fn from(key: &DbApiKey) -> Self {
        Self {
            key_id: key.id,
            user_id: key.user_id,
            tier: key.tier,
            rate_limit: key.rate_limit_per_minute,
        }
    }
}

pub trait ApiKeyExt {
    fn api_key(&self) -> Option<ApiKeyAuth>;
}

impl<T: HttpMessage> ApiKeyExt for T {
    fn api_key(&self) -> Option<ApiKeyAuth> {
        self.extensions().get::<ApiKeyAuth>().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_extract_from_x_api_key() {
        let req = TestRequest::default()
            .insert_header((API_KEY_HEADER, "vv_abc"))
            .to_srv_request();
        assert_eq!(extract_api_key(&req).as_deref(), Some("vv_abc"));
    }

    #[test]
    fn test_extract_from_apikey_header() {
        let req = TestRequest::default()
            .insert_header(("apikey", "vv_browser"))
            .to_srv_request();
        assert_eq!(extract_api_key(&req).as_deref(), Some("vv_browser"));
    }

    #[test]
    fn test_extract_from_bearer() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer vv_token"))
            .to_srv_request();
        assert_eq!(extract_api_key(&req).as_deref(), Some("vv_token"));
    }

    #[test]
    fn test_missing_or_empty_key() {
        let req = TestRequest::default().to_srv_request();
        assert!(extract_api_key(&req).is_none());

        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_srv_request();
        assert!(extract_api_key(&req).is_none());

        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer   "))
            .to_srv_request();
        assert!(extract_api_key(&req).is_none());
    }
}
