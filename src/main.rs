//! VietVan API
//!
//! Backend for a Vietnamese AI content-writing service: routes prompts to
//! hosted language models, enforces monthly token budgets per subscription
//! tier and keeps the user's content, templates and usage history.

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

mod api;
mod config;
mod db;
mod domain;
mod engine;
mod providers;

use crate::api::middleware::ApiMiddleware;
use crate::config::Settings;
use crate::db::{DbPool, UsageRepository};
use crate::providers::{build_providers, ImageProvider, ProviderRegistry, ProviderResult};

/// Days of request logs kept by the cleanup task
const REQUEST_LOG_RETENTION_DAYS: i32 = 90;
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Settings,
    pub db_pool: Option<DbPool>,
    pub providers: Arc<ProviderRegistry>,
    pub image_provider: Arc<dyn ImageProvider>,
    pub started_at: Instant,
}

impl AppState {
    pub fn from_settings(settings: Settings, db_pool: Option<DbPool>) -> ProviderResult<Self> {
        let (registry, image_provider) = build_providers(&settings)?;
        Ok(AppState {
            settings,
            db_pool,
            providers: Arc::new(registry),
            image_provider,
            started_at: Instant::now(),
        })
    }
}

/// Connect when a database URL is configured; the API still serves
/// `/health` and the docs without one.
async fn connect_database(settings: &Settings) -> Option<DbPool> {
    if settings.database.url.is_empty() {
        info!("No DATABASE_URL configured, running without database");
        return None;
    }

    match DbPool::new(&settings.database.url, settings.database.max_connections) {
        Ok(pool) => match pool.test_connection().await {
            Ok(()) => {
                info!("Database pool initialized successfully");
                Some(pool)
            }
            Err(e) => {
                warn!(error = %e, "Database connection test failed. Running without database.");
                None
            }
        },
        Err(e) => {
            warn!(error = %e, "Failed to create database pool. Running without database.");
            None
        }
    }
}

/// Prune rate-limit windows and old request logs once an hour
fn spawn_cleanup(pool: DbPool) {
    tokio::spawn(async move {
        let repo = UsageRepository::new(pool);
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = repo.cleanup_rate_limits().await {
                warn!(error = %e, "Rate limit cleanup failed");
            }
            if let Err(e) = repo.cleanup_old_logs(REQUEST_LOG_RETENTION_DAYS).await {
                warn!(error = %e, "Request log cleanup failed");
            }
        }
    });
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vietvan_api=info".parse()?)
                .add_directive("actix_web=info".parse()?)
        )
        .json()
        .init();

    let settings = Settings::load().context("Failed to load configuration")?;
    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);
    let workers = settings.server.workers.unwrap_or_else(|| num_cpus::get() * 2);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        bind = %bind_addr,
        default_model = %settings.generation.default_model,
        "Starting VietVan API"
    );

    let db_pool = connect_database(&settings).await;
    if let Some(pool) = &db_pool {
        spawn_cleanup(pool.clone());
    }

    let cors_origin = settings.cors.allow_origin.clone();
    let cors_headers = settings.cors.allow_headers.clone();
    let middleware_pool = db_pool.clone();

    let app_state = web::Data::new(
        AppState::from_settings(settings, db_pool).context("Failed to initialize model providers")?,
    );
    info!(models = ?app_state.providers.configured_codes(), "Model providers ready");

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            // Auth, rate limiting and request logs; answers preflights
            .wrap(ApiMiddleware::new(middleware_pool.clone()))
            // These wrap around ApiMiddleware, so its early responses get them too
            .wrap(TracingLogger::default())
            .wrap(middleware::Compress::default())
            .wrap(
                middleware::DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", cors_origin.clone()))
                    .add(("Access-Control-Allow-Headers", cors_headers.clone()))
                    .add(("Access-Control-Allow-Methods", "GET, POST, PATCH, DELETE, OPTIONS"))
                    .add(("X-Service", "vietvan-api"))
                    .add(("X-Version", env!("CARGO_PKG_VERSION")))
            )
            .configure(api::configure_routes)
    })
    .workers(workers)
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run()
    .await?;

    Ok(())
}
