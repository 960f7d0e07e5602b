use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod ai_spec;
mod catalog;
mod config;
mod customizations;
mod error;
mod middleware;
mod models;
mod ownership;
mod pages;
mod repositories;
mod routes;
mod state;
mod templates;
mod validation;

use common::{
    TokenVerifier,
    database::{self, DatabaseConfig},
};
use tokio::net::TcpListener;

use crate::{
    ai_spec::AiSpecClient,
    catalog::DefaultCatalog,
    config::ServiceConfig,
    customizations::CustomizationService,
    pages::PageService,
    repositories::{CustomizationRepository, PageRepository, TemplateRepository},
    state::AppState,
    templates::TemplateService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting API service");

    let service_config = ServiceConfig::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    // Check database connectivity
    if database::health_check(&pool).await {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }
    database::run_migrations(&pool).await?;

    let verifier = TokenVerifier::from_env()?;
    let ai = AiSpecClient::new(service_config.ai.clone())?;
    if service_config.ai.api_key.is_none() {
        info!("AI_API_KEY not set; spec generation will serve mock specs");
    }

    // Initialize repositories
    let pages = Arc::new(PageRepository::new(pool.clone()));
    let template_repository = Arc::new(TemplateRepository::new(pool.clone()));
    let customization_repository = Arc::new(CustomizationRepository::new(pool.clone()));

    let templates = TemplateService::new(template_repository, Arc::new(DefaultCatalog::new()));
    let customizations = CustomizationService::new(customization_repository, pages.clone());
    let page_service = PageService::new(pages, templates.clone(), customizations.clone());

    let app_state = AppState {
        db_pool: pool,
        verifier,
        templates,
        pages: page_service,
        customizations,
        ai,
    };

    info!("API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&service_config.bind_addr).await?;
    info!("API service listening on {}", service_config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
