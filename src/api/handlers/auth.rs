//! Account signup
//!
//! Creates a profile on the free tier together with its first API key.
//! This is the only write endpoint reachable without a key.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use super::{bad_request, db_error_response, require_db, username_taken, ErrorResponse};
use crate::db::{
    CreateApiKeyResponse, CreateProfileRequest, DbError, Profile, ProfileRepository, SubscriptionTier,
};
use crate::AppState;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub username: String,
    pub full_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Label for the first API key
    #[serde(default)]
    pub key_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignupResponse {
    pub profile: Profile,
    /// Shown once; only its hash is stored
    pub api_key: String,
    pub key_prefix: String,
    pub message: &'static str,
}

/// Usernames are 3-32 characters of letters, digits, `_`, `.` or `-`
pub fn validate_username(username: &str) -> Result<(), String> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(format!("username must be {}-{} characters", USERNAME_MIN, USERNAME_MAX));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')) {
        return Err("username may only contain letters, digits, '_', '.' and '-'".to_string());
    }
    Ok(())
}

/// POST /api/v1/auth/signup
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Profile and API key created", body = SignupResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Username taken", body = ErrorResponse),
        (status = 503, description = "Database unavailable", body = ErrorResponse)
    )
)]
pub async fn signup(state: web::Data<AppState>, body: web::Json<SignupRequest>) -> HttpResponse {
    let pool = match require_db(&state) {
        Ok(pool) => pool,
        Err(response) => return response,
    };

    let body = body.into_inner();
    let username = body.username.trim().to_string();
    let full_name = body.full_name.trim().to_string();

    if let Err(message) = validate_username(&username) {
        return bad_request(message);
    }
    if full_name.is_empty() {
        return bad_request("full_name must not be empty");
    }

    let profiles = ProfileRepository::new(pool);
    match profiles.username_taken(&username).await {
        Ok(false) => {}
        Ok(true) => return username_taken(),
        Err(e) => return db_error_response(&e, "check username"),
    }

    let created = profiles
        .create_with_first_key(
            CreateProfileRequest {
                username,
                full_name,
                avatar_url: body.avatar_url,
                tier: SubscriptionTier::Free,
            },
            body.key_name.unwrap_or_else(|| "default".to_string()),
        )
        .await;

    match created {
        Ok((profile, key)) => signup_response(profile, key),
        // Lost the race against a concurrent signup for the same name
        Err(DbError::Conflict(_)) => username_taken(),
        Err(e) => db_error_response(&e, "create account"),
    }
}

fn signup_response(profile: Profile, key: CreateApiKeyResponse) -> HttpResponse {
    info!(user_id = %profile.id, key_prefix = %key.key_prefix, "Signup completed");

    HttpResponse::Created().json(SignupResponse {
        profile,
        api_key: key.api_key,
        key_prefix: key.key_prefix,
        message: "Save the api_key value - it won't be shown again!",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use actix_web::{http::StatusCode, test, App};

    #[::core::prelude::v1::test]
    fn test_username_rules() {
        assert!(validate_username("nguyen_van.a").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
        assert!(validate_username("nguyễn").is_err());
        assert!(validate_username("has space").is_err());
    }

    #[actix_web::test]
    async fn test_signup_without_database() {
        let state = AppState::from_settings(Settings::default(), None).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/api/v1/auth/signup", web::post().to(signup)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/signup")
            .set_json(serde_json::json!({ "username": "lan", "full_name": "Trần Lan" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
