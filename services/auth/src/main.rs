use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod accounts;
mod config;
mod error;
mod invites;
mod jwt;
mod middleware;
mod models;
mod password;
mod repositories;
mod routes;
mod session;
mod validation;

use common::{
    cache::{RedisConfig, RedisPool},
    database::{self, DatabaseConfig},
};
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::{
    accounts::AccountService,
    config::ServiceConfig,
    invites::InviteService,
    jwt::{JwtConfig, JwtService},
    repositories::{InviteRepository, UserRepository},
    session::SessionManager,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub sessions: SessionManager,
    pub jwt_service: JwtService,
    pub accounts: AccountService,
    pub invites: InviteService,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting authentication service");

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

    // Initialize JWT service
    let jwt_service = JwtService::new(JwtConfig::from_env()?)?;

    // Initialize Redis connection pool
    let redis_pool = RedisPool::new(&RedisConfig::from_env()?)?;
    let sessions = SessionManager::new(redis_pool, jwt_service.refresh_token_expiry());

    let users = Arc::new(UserRepository::new(pool.clone()));
    let invite_repository = Arc::new(InviteRepository::new(pool.clone()));

    let app_state = AppState {
        db_pool: pool,
        sessions,
        jwt_service,
        accounts: AccountService::new(users.clone()),
        invites: InviteService::new(users, invite_repository, service_config.invite_ttl()),
    };

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&service_config.bind_addr).await?;
    info!("Authentication service listening on {}", service_config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
