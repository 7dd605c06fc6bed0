//! ctrk-api library interface
//!
//! Exposes the router, application state, and the ingestion pipeline for
//! integration testing.

pub mod api;
pub mod db;
pub mod error;
pub mod ingest;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use ctrk_common::config::ServiceConfig;
use ctrk_common::events::EventBus;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Resolved service configuration
    pub config: Arc<ServiceConfig>,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, config: ServiceConfig) -> Self {
        Self {
            db,
            event_bus,
            config: Arc::new(config),
            startup_time: Utc::now(),
        }
    }

    /// The ingestion orchestrator bound to this state
    pub fn orchestrator(&self) -> ingest::IngestOrchestrator {
        ingest::IngestOrchestrator::new(
            self.db.clone(),
            self.event_bus.clone(),
            self.config.batch_size,
        )
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    // Dashboard origins vary per deployment; the API carries no
    // credentials, so a permissive policy is acceptable here.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Multipart framing adds a little overhead on top of the payload cap;
    // the exact per-file limit is enforced in the upload handler.
    let body_limit = state.config.max_upload_bytes + 64 * 1024;

    Router::new()
        .merge(api::component_routes())
        .merge(api::upload_routes())
        .merge(api::export_routes())
        .merge(api::health_routes())
        .route("/api/events", get(api::event_stream))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
