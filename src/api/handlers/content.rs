//! Saved content endpoints
//!
//! Every query is scoped to the caller; another user's id answers 404.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{db_error_response, not_found, require_auth, require_db, ErrorResponse};
use crate::db::{ContentFilter, ContentRepository, ContentStatus, ContentUpdate, UserContent};
use crate::domain::PageRequest;
use crate::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ContentQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<ContentStatus>,
    pub category: Option<String>,
    /// Case-insensitive match on title or body
    pub search: Option<String>,
}

impl ContentQuery {
    fn filter(&self) -> ContentFilter {
        ContentFilter {
            status: self.status,
            category: self.category.clone().filter(|c| !c.trim().is_empty()),
            search: self.search.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContentListResponse {
    pub items: Vec<UserContent>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub has_more: bool,
}

/// GET /api/v1/content
#[utoipa::path(
    get,
    path = "/api/v1/content",
    tag = "content",
    params(ContentQuery),
    responses(
        (status = 200, description = "Content, newest first", body = ContentListResponse)
    ),
    security(("api_key" = []))
)]
pub async fn list_content(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<ContentQuery>,
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
    match ContentRepository::new(pool).list(auth.user_id, &query.filter(), page).await {
        Ok(page) => HttpResponse::Ok().json(ContentListResponse {
            items: page.items,
            total: page.total,
            page: page.page,
            limit: page.limit,
            has_more: page.has_more,
        }),
        Err(e) => db_error_response(&e, "list content"),
    }
}

/// GET /api/v1/content/{id}
#[utoipa::path(
    get,
    path = "/api/v1/content/{id}",
    tag = "content",
    params(("id" = Uuid, Path, description = "Content id")),
    responses(
        (status = 200, description = "Content item", body = UserContent),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn get_content(
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

    match ContentRepository::new(pool).get(auth.user_id, path.into_inner()).await {
        Ok(Some(content)) => HttpResponse::Ok().json(content),
        Ok(None) => not_found("Content not found"),
        Err(e) => db_error_response(&e, "load content"),
    }
}

/// PATCH /api/v1/content/{id}
#[utoipa::path(
    patch,
    path = "/api/v1/content/{id}",
    tag = "content",
    params(("id" = Uuid, Path, description = "Content id")),
    request_body = ContentUpdate,
    responses(
        (status = 200, description = "Updated content", body = UserContent),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn update_content(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ContentUpdate>,
) -> HttpResponse {
    let auth = match require_auth(&req) {
        Ok(auth) => auth,
        Err(response) => return response,
    };
    let pool = match require_db(&state) {
        Ok(pool) => pool,
        Err(response) => return response,
    };

    let id = path.into_inner();
    match ContentRepository::new(pool).update(auth.user_id, id, &body).await {
        Ok(Some(content)) => {
            info!(user_id = %auth.user_id, content_id = %id, status = content.status.as_str(), "Content updated");
            HttpResponse::Ok().json(content)
        }
        Ok(None) => not_found("Content not found"),
        Err(e) => db_error_response(&e, "update content"),
    }
}

/// DELETE /api/v1/content/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/content/{id}",
    tag = "content",
    params(("id" = Uuid, Path, description = "Content id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn delete_content(
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

    let id = path.into_inner();
    match ContentRepository::new(pool).delete(auth.user_id, id).await {
        Ok(true) => {
            info!(user_id = %auth.user_id, content_id = %id, "Content deleted");
            HttpResponse::NoContent().finish()
        }
        Ok(false) => not_found("Content not found"),
        Err(e) => db_error_response(&e, "delete content"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_parses_filters() {
        let query: ContentQuery = serde_json::from_value(serde_json::json!({
            "page": 2,
            "status": "published",
            "category": "  ",
            "search": "phở"
        }))
        .unwrap();
        let filter = query.filter();
        assert_eq!(filter.status, Some(ContentStatus::Published));
        assert!(filter.category.is_none());
        assert_eq!(filter.search.as_deref(), Some("phở"));
    }
}
