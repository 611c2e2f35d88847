//! Text generation endpoint

use actix_web::{web, HttpRequest, HttpResponse};
use std::sync::Arc;
use tracing::info;

use super::{engine_error_response, require_auth, require_db, ErrorResponse};
use crate::db::ProfileRepository;
use crate::engine::{ContentEngine, GenerateRequest, GenerationOutcome};
use crate::AppState;

/// POST /api/v1/generate
///
/// Reserves the estimated tokens, calls the selected model and saves the
/// result as a draft. Tokens are only charged when the model answered.
#[utoipa::path(
    post,
    path = "/api/v1/generate",
    tag = "generation",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Content generated", body = GenerationOutcome),
        (status = 400, description = "Invalid prompt or parameters", body = ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 403, description = "Monthly token limit exceeded", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
        (status = 502, description = "Model provider error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn generate_content(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<GenerateRequest>,
) -> HttpResponse {
    let auth = match require_auth(&req) {
        Ok(auth) => auth,
        Err(response) => return response,
    };
    let pool = match require_db(&state) {
        Ok(pool) => pool,
        Err(response) => return response,
    };

    let engine = ContentEngine::new(
        Arc::new(ProfileRepository::new(pool)),
        state.providers.clone(),
        state.settings.generation.clone(),
    );

    match engine.generate(auth.user_id, body.into_inner()).await {
        Ok(outcome) => {
            info!(key_id = %auth.key_id, content_id = %outcome.content_id, tokens = outcome.used_tokens, "Generate request completed");
            HttpResponse::Ok().json(outcome)
        }
        Err(e) => engine_error_response(&e),
    }
}
