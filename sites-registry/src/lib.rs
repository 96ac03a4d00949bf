//! sites-registry library - station registry service
//!
//! Stations, platforms, instruments, and per-instrument regions of interest
//! behind an HTTP API. Name allocation relies on storage uniqueness
//! constraints; ROI geometry changes go through the lifecycle service.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod services;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Build application router
///
/// `/health` needs no caller identity; every `/api` route extracts one.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::station_routes())
        .merge(api::platform_routes())
        .merge(api::instrument_routes())
        .merge(api::roi_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
