//! API key management for the calling user

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{bad_request, db_error_response, not_found, require_auth, require_db, ErrorResponse};
use crate::db::{ApiKeyRepository, CreateApiKeyRequest, DbApiKey, SubscriptionTier};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateKeyRequest {
    pub name: String,
    /// Capped at the tier's default
    #[serde(default)]
    pub rate_limit_per_minute: Option<i32>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateKeyResponse {
    pub id: Uuid,
    /// Shown once
    pub api_key: String,
    pub key_prefix: String,
    pub name: String,
    pub rate_limit_per_minute: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub message: &'static str,
}

/// API key info without secrets
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiKeyInfo {
    pub id: Uuid,
    pub key_prefix: String,
    pub name: String,
    pub tier: SubscriptionTier,
    pub rate_limit_per_minute: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<DbApiKey> for ApiKeyInfo {
    fn from(key: DbApiKey) -> Self {
        ApiKeyInfo {
            id: key.id,
            key_prefix: key.key_prefix,
            name: key.name,
            tier: key.tier,
            rate_limit_per_minute: key.rate_limit_per_minute,
            is_active: key.is_active,
            created_at: key.created_at,
            last_used_at: key.last_used_at,
            expires_at: key.expires_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListKeysResponse {
    pub keys: Vec<ApiKeyInfo>,
    pub count: usize,
}

/// Requested per-minute limit, never above what the tier allows
pub fn effective_rate_limit(tier: SubscriptionTier, requested: Option<i32>) -> Result<i32, String> {
    let ceiling = tier.default_rate_limit();
    match requested {
        None => Ok(ceiling),
        Some(limit) if limit < 1 => Err("rate_limit_per_minute must be positive".to_string()),
        Some(limit) => Ok(limit.min(ceiling)),
    }
}

/// GET /api/v1/keys
#[utoipa::path(
    get,
    path = "/api/v1/keys",
    tag = "keys",
    responses((status = 200, description = "Own API keys, newest first", body = ListKeysResponse)),
    security(("api_key" = []))
)]
pub async fn list_keys(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let auth = match require_auth(&req) {
        Ok(auth) => auth,
        Err(response) => return response,
    };
    let pool = match require_db(&state) {
        Ok(pool) => pool,
        Err(response) => return response,
    };

    match ApiKeyRepository::new(pool).list_for_user(auth.user_id).await {
        Ok(keys) => {
            let keys: Vec<ApiKeyInfo> = keys.into_iter().map(ApiKeyInfo::from).collect();
            HttpResponse::Ok().json(ListKeysResponse { count: keys.len(), keys })
        }
        Err(e) => db_error_response(&e, "list API keys"),
    }
}

/// POST /api/v1/keys
#[utoipa::path(
    post,
    path = "/api/v1/keys",
    tag = "keys",
    request_body = CreateKeyRequest,
    responses(
        (status = 201, description = "Key created", body = CreateKeyResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn create_key(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreateKeyRequest>,
) -> HttpResponse {
    let auth = match require_auth(&req) {
        Ok(auth) => auth,
        Err(response) => return response,
    };
    let pool = match require_db(&state) {
        Ok(pool) => pool,
        Err(response) => return response,
    };

    let body = body.into_inner();
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return bad_request("name must not be empty");
    }
    let rate_limit = match effective_rate_limit(auth.tier, body.rate_limit_per_minute) {
        Ok(limit) => limit,
        Err(message) => return bad_request(message),
    };
    if body.expires_at.is_some_and(|at| at <= Utc::now()) {
        return bad_request("expires_at must be in the future");
    }

    let request = CreateApiKeyRequest {
        user_id: auth.user_id,
        name,
        tier: auth.tier,
        rate_limit_per_minute: Some(rate_limit),
        expires_at: body.expires_at,
    };

    match ApiKeyRepository::new(pool).create(request).await {
        Ok(created) => {
            info!(user_id = %auth.user_id, key_id = %created.id, created_by = %auth.key_id, "API key created");
            HttpResponse::Created().json(CreateKeyResponse {
                id: created.id,
                api_key: created.api_key,
                key_prefix: created.key_prefix,
                name: created.name,
                rate_limit_per_minute: created.rate_limit_per_minute,
                expires_at: created.expires_at,
                message: "Save the api_key value - it won't be shown again!",
            })
        }
        Err(e) => db_error_response(&e, "create API key"),
    }
}

/// DELETE /api/v1/keys/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/keys/{id}",
    tag = "keys",
    params(("id" = Uuid, Path, description = "Key id")),
    responses(
        (status = 204, description = "Key revoked"),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn revoke_key(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let auth = match require_auth(&req) {
        Ok(auth) => auth,
        Err(response) => return response,
    };
    let pool = match require_db(&state) {
        Ok(pool) => pool,
        Err(response) => return response,
    };

    match ApiKeyRepository::new(pool).revoke(auth.user_id, path.into_inner()).await {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => not_found("API key not found"),
        Err(e) => db_error_response(&e, "revoke API key"),
    }
}
