//! API module - HTTP routes and handlers

pub mod handlers;
pub mod middleware;
pub mod openapi;

use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::openapi::ApiDoc;

/// Configure all API routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/auth/signup", web::post().to(handlers::auth::signup))
            .route("/generate", web::post().to(handlers::generate::generate_content))
            .service(
                web::scope("/images")
                    .route("", web::get().to(handlers::images::list_images))
                    .route("/generate", web::post().to(handlers::images::generate_image))
            )
            .service(
                web::scope("/content")
                    .route("", web::get().to(handlers::content::list_content))
                    .route("/{id}", web::get().to(handlers::content::get_content))
                    .route("/{id}", web::patch().to(handlers::content::update_content))
                    .route("/{id}", web::delete().to(handlers::content::delete_content))
            )
            .service(
                web::scope("/templates")
                    // More specific routes first
                    .route("/content/categories", web::get().to(handlers::templates::list_categories))
                    .route("/content", web::get().to(handlers::templates::list_content_templates))
                    .route("/content", web::post().to(handlers::templates::create_content_template))
                    .route("/tone", web::get().to(handlers::templates::list_tone_templates))
                    .route("/tone", web::post().to(handlers::templates::create_tone_template))
                    .route("/tone/{id}", web::delete().to(handlers::templates::delete_tone_template))
            )
            .service(
                web::scope("/profile")
                    .route("", web::get().to(handlers::profile::get_profile))
                    .route("", web::patch().to(handlers::profile::update_profile))
                    .route("/allowance", web::get().to(handlers::profile::check_allowance))
            )
            .service(
                web::scope("/usage")
                    .route("", web::get().to(handlers::usage::get_usage))
                    .route("/summary", web::get().to(handlers::usage::get_usage_summary))
            )
            .service(
                web::scope("/keys")
                    .route("", web::get().to(handlers::keys::list_keys))
                    .route("", web::post().to(handlers::keys::create_key))
                    .route("/{id}", web::delete().to(handlers::keys::revoke_key))
            )
    )
    .route("/health", web::get().to(handlers::health::health_check))
    // Swagger UI and OpenAPI spec
    .service(
        SwaggerUi::new("/swagger-ui/{_:.*}")
            .url("/api-docs/openapi.json", ApiDoc::openapi())
    );
}
