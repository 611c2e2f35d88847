//! Tone and content template endpoints

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{bad_request, db_error_response, not_found, require_auth, require_db, ErrorResponse};
use crate::db::{ContentTemplate, NewContentTemplate, NewToneTemplate, TemplateRepository, ToneTemplate};
use crate::domain::GenerationSettings;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateToneTemplateRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Style options applied when the template is picked
    pub settings: GenerationSettings,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateContentTemplateRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    pub prompt_template: String,
    #[serde(default)]
    pub settings: Option<GenerationSettings>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
}

fn required(value: &str, field: &str) -> Result<String, HttpResponse> {
    let value = value.trim();
    if value.is_empty() {
        Err(bad_request(format!("{} must not be empty", field)))
    } else {
        Ok(value.to_string())
    }
}

/// GET /api/v1/templates/tone
#[utoipa::path(
    get,
    path = "/api/v1/templates/tone",
    tag = "templates",
    responses((status = 200, description = "System and own tone templates, by name", body = [ToneTemplate])),
    security(("api_key" = []))
)]
pub async fn list_tone_templates(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let auth = match require_auth(&req) {
        Ok(auth) => auth,
        Err(response) => return response,
    };
    let pool = match require_db(&state) {
        Ok(pool) => pool,
        Err(response) => return response,
    };

    match TemplateRepository::new(pool).list_tone_templates(auth.user_id).await {
        Ok(templates) => HttpResponse::Ok().json(templates),
        Err(e) => db_error_response(&e, "list tone templates"),
    }
}

/// POST /api/v1/templates/tone
#[utoipa::path(
    post,
    path = "/api/v1/templates/tone",
    tag = "templates",
    request_body = CreateToneTemplateRequest,
    responses(
        (status = 201, description = "Template created", body = ToneTemplate),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn create_tone_template(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreateToneTemplateRequest>,
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
    let name = match required(&body.name, "name") {
        Ok(name) => name,
        Err(response) => return response,
    };

    let template = NewToneTemplate {
        name,
        description: body.description,
        settings: serde_json::to_value(&body.settings).unwrap_or_default(),
    };

    match TemplateRepository::new(pool).create_tone_template(auth.user_id, template).await {
        Ok(template) => {
            info!(user_id = %auth.user_id, template_id = %template.id, "Tone template created");
            HttpResponse::Created().json(template)
        }
        Err(e) => db_error_response(&e, "create tone template"),
    }
}

/// DELETE /api/v1/templates/tone/{id}
///
/// System templates and other users' templates answer 404.
#[utoipa::path(
    delete,
    path = "/api/v1/templates/tone/{id}",
    tag = "templates",
    params(("id" = Uuid, Path, description = "Template id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn delete_tone_template(
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

    match TemplateRepository::new(pool).delete_tone_template(auth.user_id, path.into_inner()).await {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => not_found("Tone template not found"),
        Err(e) => db_error_response(&e, "delete tone template"),
    }
}

/// GET /api/v1/templates/content
#[utoipa::path(
    get,
    path = "/api/v1/templates/content",
    tag = "templates",
    params(CategoryQuery),
    responses((status = 200, description = "Content templates, by name", body = [ContentTemplate])),
    security(("api_key" = []))
)]
pub async fn list_content_templates(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<CategoryQuery>,
) -> HttpResponse {
    let auth = match require_auth(&req) {
        Ok(auth) => auth,
        Err(response) => return response,
    };
    let pool = match require_db(&state) {
        Ok(pool) => pool,
        Err(response) => return response,
    };

    let category = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
    match TemplateRepository::new(pool).list_content_templates(auth.user_id, category).await {
        Ok(templates) => HttpResponse::Ok().json(templates),
        Err(e) => db_error_response(&e, "list content templates"),
    }
}

/// GET /api/v1/templates/content/categories
#[utoipa::path(
    get,
    path = "/api/v1/templates/content/categories",
    tag = "templates",
    responses((status = 200, description = "Distinct categories, sorted", body = CategoriesResponse)),
    security(("api_key" = []))
)]
pub async fn list_categories(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let auth = match require_auth(&req) {
        Ok(auth) => auth,
        Err(response) => return response,
    };
    let pool = match require_db(&state) {
        Ok(pool) => pool,
        Err(response) => return response,
    };

    match TemplateRepository::new(pool).list_categories(auth.user_id).await {
        Ok(categories) => HttpResponse::Ok().json(CategoriesResponse { categories }),
        Err(e) => db_error_response(&e, "list categories"),
    }
}

/// POST /api/v1/templates/content
#[utoipa::path(
    post,
    path = "/api/v1/templates/content",
    tag = "templates",
    request_body = CreateContentTemplateRequest,
    responses(
        (status = 201, description = "Template created", body = ContentTemplate),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn create_content_template(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreateContentTemplateRequest>,
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
    let fields = required(&body.name, "name").and_then(|name| {
        let category = required(&body.category, "category")?;
        let prompt_template = required(&body.prompt_template, "prompt_template")?;
        Ok((name, category, prompt_template))
    });
    let (name, category, prompt_template) = match fields {
        Ok(fields) => fields,
        Err(response) => return response,
    };

    let template = NewContentTemplate {
        name,
        description: body.description,
        category,
        prompt_template,
        settings: body.settings.and_then(|s| serde_json::to_value(s).ok()),
    };

    match TemplateRepository::new(pool).create_content_template(auth.user_id, template).await {
        Ok(template) => {
            info!(user_id = %auth.user_id, template_id = %template.id, category = %template.category, "Content template created");
            HttpResponse::Created().json(template)
        }
        Err(e) => db_error_response(&e, "create content template"),
    }
}
