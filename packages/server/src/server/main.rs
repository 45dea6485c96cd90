// Main entry point for the queue server

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use queue_core::kernel::{
    start_scheduler, BaseCatalog, EventBus, InMemoryCatalog, PostgresCatalog, RateLimiter,
    ServerDeps,
};
use queue_core::server::{build_app, AxumAppState};
use queue_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,queue_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Crowdqueue server");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(vote_order = ?config.queue.vote_order, "Configuration loaded");

    let catalog: Arc<dyn BaseCatalog> = match &config.database_url {
        Some(database_url) => {
            // Connect to database
            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Database connected");

            // Run migrations
            tracing::info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            tracing::info!("Migrations complete");

            Arc::new(PostgresCatalog::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, serving the in-memory sample catalog");
            Arc::new(InMemoryCatalog::with_samples())
        }
    };

    let server_deps = ServerDeps::new(
        catalog,
        EventBus::with_capacity(config.queue.event_channel_capacity),
        Arc::new(RateLimiter::new(
            config.queue.vote_rate_limit_calls,
            config.queue.vote_rate_limit_window,
        )),
    );

    // Housekeeping (rate limiter sweep, empty topic cleanup)
    let _scheduler = start_scheduler(server_deps.clone(), config.queue.housekeeping_interval)
        .await
        .context("Failed to start scheduled tasks")?;

    // Build application
    let app = build_app(AxumAppState::new(server_deps, &config.queue));

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Queue API: http://localhost:{}/api/queue", config.port);
    tracing::info!("Live updates: ws://localhost:{}/ws/queue", config.port);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
