//! Charge handover service - two-stage approval of duty handovers

pub mod api;
pub mod config;
pub mod directory;
pub mod error;
pub mod handover;
pub mod identity;
pub mod models;
pub mod store;
pub mod websocket;

use std::sync::Arc;

use axum::{routing::get, Router};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::directory::EmployeeDirectory;
use crate::handover::{HandoverService, ReceiverMatch};
use crate::identity::Authenticator;

/// Application state shared across handlers
pub struct AppState {
    pub service: HandoverService,
    pub auth: Authenticator,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        directory: Arc<dyn EmployeeDirectory>,
        auth: Authenticator,
        receiver_match: ReceiverMatch,
    ) -> Arc<Self> {
        Arc::new(Self {
            service: HandoverService::new(store::Store::new(pool), directory, receiver_match),
            auth,
        })
    }
}

/// Build the HTTP router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(websocket::handler))
        .merge(api::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
