//! API Module
//!
//! HTTP API layer of the aggregation server.

pub mod error;
pub mod health;
pub mod metadata;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

/// Upper bound on a pushed subgraph; axum's 2 MB default is too small for
/// pipelines with thousands of executions
pub const PUSH_BODY_LIMIT: usize = 512 * 1024 * 1024;

/// Create the main API router with all endpoints
pub fn create_router(pool: SqlitePool) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Metadata transfer
        .route(
            "/mlmd_push",
            post(metadata::push_metadata).layer(DefaultBodyLimit::max(PUSH_BODY_LIMIT)),
        )
        .route("/mlmd_pull/{pipeline}", get(metadata::pull_metadata))
        .route("/pipelines", get(metadata::list_pipelines))
        // Add state and middleware
        .with_state(pool)
        .layer(TraceLayer::new_for_http())
}
