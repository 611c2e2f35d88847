//! Image generation and history

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{db_error_response, engine_error_response, require_auth, require_db, ErrorResponse};
use crate::db::{ImageGeneration, ImageRepository};
use crate::domain::PageRequest;
use crate::engine::{ImageEngine, ImageOutcome, ImageRequest};
use crate::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImageListResponse {
    pub items: Vec<ImageGeneration>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub has_more: bool,
}

/// POST /api/v1/images/generate
#[utoipa::path(
    post,
    path = "/api/v1/images/generate",
    tag = "images",
    request_body = ImageRequest,
    responses(
        (status = 200, description = "Image generated", body = ImageOutcome),
        (status = 400, description = "Invalid prompt or size", body = ErrorResponse),
        (status = 502, description = "Image provider error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn generate_image(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<ImageRequest>,
) -> HttpResponse {
    let auth = match require_auth(&req) {
        Ok(auth) => auth,
        Err(response) => return response,
    };
    let pool = match require_db(&state) {
        Ok(pool) => pool,
        Err(response) => return response,
    };

    let engine = ImageEngine::new(
        ImageRepository::new(pool),
        state.image_provider.clone(),
        state.settings.generation.max_prompt_chars,
    );
    match engine.generate(auth.user_id, body.into_inner()).await {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => engine_error_response(&e),
    }
}

/// GET /api/v1/images
#[utoipa::path(
    get,
    path = "/api/v1/images",
    tag = "images",
    params(PageQuery),
    responses(
        (status = 200, description = "Image generations, newest first", body = ImageListResponse)
    ),
    security(("api_key" = []))
)]
pub async fn list_images(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> HttpResponse {
    let auth = match require_auth(&req) {
        Ok(auth) => auth,
        Err(response) => return response,
    };
    let pool = match require_db(&state) {
        Ok(pool) => pool,
        Err(response) => return response,
    };

    let page = PageRequest::new(query.page, query.limit);
    match ImageRepository::new(pool).list(auth.user_id, page).await {
        Ok(page) => HttpResponse::Ok().json(ImageListResponse {
            items: page.items,
            total: page.total,
            page: page.page,
            limit: page.limit,
            has_more: page.has_more,
        }),
        Err(e) => db_error_response(&e, "list images"),
    }
}
