//! Profile and token allowance endpoints

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{
    bad_request, db_error_response, not_found, require_auth, require_db, username_taken, ErrorResponse,
};
use crate::api::handlers::auth::validate_username;
use crate::db::{DbError, Profile, ProfileRepository, ProfileUpdate};
use crate::AppState;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl UpdateProfileRequest {
    fn into_update(self) -> Result<ProfileUpdate, String> {
        let username = self.username.map(|u| u.trim().to_string());
        if let Some(username) = &username {
            validate_username(username)?;
        }
        let full_name = self.full_name.map(|n| n.trim().to_string());
        if full_name.as_deref() == Some("") {
            return Err("full_name must not be empty".to_string());
        }
        Ok(ProfileUpdate {
            username,
            full_name,
            avatar_url: self.avatar_url,
        })
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AllowanceQuery {
    /// Tokens the caller is about to spend
    pub estimated_tokens: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AllowanceResponse {
    pub can_generate: bool,
    pub available_tokens: i32,
    pub tokens_used: i32,
    pub monthly_token_limit: i32,
}

/// GET /api/v1/profile
#[utoipa::path(
    get,
    path = "/api/v1/profile",
    tag = "profile",
    responses(
        (status = 200, description = "Own profile", body = Profile),
        (status = 404, description = "Profile missing", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn get_profile(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let auth = match require_auth(&req) {
        Ok(auth) => auth,
        Err(response) => return response,
    };
    let pool = match require_db(&state) {
        Ok(pool) => pool,
        Err(response) => return response,
    };

    match ProfileRepository::new(pool).get(auth.user_id).await {
        Ok(Some(profile)) => HttpResponse::Ok().json(profile),
        Ok(None) => not_found("Profile not found"),
        Err(e) => db_error_response(&e, "load profile"),
    }
}

/// PATCH /api/v1/profile
#[utoipa::path(
    patch,
    path = "/api/v1/profile",
    tag = "profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = Profile),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Username taken", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn update_profile(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<UpdateProfileRequest>,
) -> HttpResponse {
    let auth = match require_auth(&req) {
        Ok(auth) => auth,
        Err(response) => return response,
    };
    let pool = match require_db(&state) {
        Ok(pool) => pool,
        Err(response) => return response,
    };

    let update = match body.into_inner().into_update() {
        Ok(update) => update,
        Err(message) => return bad_request(message),
    };

    let repo = ProfileRepository::new(pool);
    if let Some(username) = &update.username {
        let current = match repo.get(auth.user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => return not_found("Profile not found"),
            Err(e) => return db_error_response(&e, "load profile"),
        };
        if !current.username.eq_ignore_ascii_case(username) {
            match repo.username_taken(username).await {
                Ok(false) => {}
                Ok(true) => return username_taken(),
                Err(e) => return db_error_response(&e, "check username"),
            }
        }
    }

    match repo.update(auth.user_id, update).await {
        Ok(Some(profile)) => HttpResponse::Ok().json(profile),
        Ok(None) => not_found("Profile not found"),
        Err(DbError::Conflict(_)) => username_taken(),
        Err(e) => db_error_response(&e, "update profile"),
    }
}

/// GET /api/v1/profile/allowance
///
/// Applies a due monthly reset but reserves nothing.
#[utoipa::path(
    get,
    path = "/api/v1/profile/allowance",
    tag = "profile",
    params(AllowanceQuery),
    responses((status = 200, description = "Allowance check", body = AllowanceResponse)),
    security(("api_key" = []))
)]
pub async fn check_allowance(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<AllowanceQuery>,
) -> HttpResponse {
    let auth = match require_auth(&req) {
        Ok(auth) => auth,
        Err(response) => return response,
    };
    let pool = match require_db(&state) {
        Ok(pool) => pool,
        Err(response) => return response,
    };

    let estimate = query.estimated_tokens.unwrap_or(0);
    if estimate < 0 {
        return bad_request("estimated_tokens must not be negative");
    }

    match ProfileRepository::new(pool).check_allowance(auth.user_id, estimate).await {
        Ok(decision) => HttpResponse::Ok().json(AllowanceResponse {
            can_generate: decision.allowed,
            available_tokens: decision.available,
            tokens_used: decision.tokens_used,
            monthly_token_limit: decision.monthly_token_limit,
        }),
        Err(e) => db_error_response(&e, "check allowance"),
    }
}
