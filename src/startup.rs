//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{middleware, Router};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::application::services::TokenCodec;
use crate::config::Settings;
use crate::infrastructure::database;
use crate::infrastructure::email::{LogMailer, Mailer};
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::middleware::{cors, logging, RateLimiter};
use crate::shared::snowflake::SnowflakeGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub snowflake: Arc<SnowflakeGenerator>,
    pub settings: Arc<Settings>,
    pub tokens: TokenCodec,
    pub mailer: Arc<dyn Mailer>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Assemble state from an existing pool and settings
    pub fn new(db: PgPool, settings: Settings, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            db,
            snowflake: Arc::new(SnowflakeGenerator::new(u64::from(
                settings.snowflake.machine_id,
            ))),
            tokens: TokenCodec::new(&settings.jwt),
            rate_limiter: Arc::new(RateLimiter::from_settings(&settings.rate_limit)),
            mailer,
            settings: Arc::new(settings),
        }
    }
}

/// Full router with the cross-cutting layers applied
pub fn build_router(state: AppState) -> Router {
    let cors = cors::create_cors_layer(&state.settings.cors);

    routes::create_router(state)
        .layer(middleware::from_fn(logging::track_metrics))
        .layer(logging::create_trace_layer())
        .layer(CompressionLayer::new())
        .layer(cors)
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        if settings.database.run_migrations {
            database::run_migrations(&db).await?;
            tracing::info!("Database migrations applied");
        }

        let mailer: Arc<dyn Mailer> = Arc::new(LogMailer::new(settings.email.clone()));
        let addr = settings.server_addr();
        let state = AppState::new(db, settings, mailer);

        database::bootstrap_admin(&state.db, &state.settings.bootstrap, &state.snowflake).await?;

        health::init_server_start();
        let router = build_router(state);

        // Bind to address
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
