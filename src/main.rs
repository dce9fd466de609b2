//! Charge handover service - two-stage approval of duty handovers

use charge_handover::config::Config;
use charge_handover::{router, store, AppState};
use clap::Parser;
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "charge_handover=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();

    // Database connection
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    store::run_migrations(&pool).await?;

    let state = AppState::new(
        pool,
        config.directory()?,
        config.authenticator()?,
        config.receiver_match(),
    );
    let app = router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!(
        receiver_match = ?config.receiver_match(),
        "Server listening on {}",
        listener.local_addr()?
    );

    axum::serve(listener, app).await?;

    Ok(())
}
