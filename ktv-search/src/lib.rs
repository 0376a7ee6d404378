//! ktv-search library interface
//!
//! Aggregated karaoke catalog search: the fan-out engine, the upstream
//! client, and the HTTP surface built on them.

pub mod api;
pub mod error;
pub mod logging;
pub mod search;
pub mod services;
pub mod sink;

pub use crate::error::{ApiError, ApiResult};

use axum::http::{header, Method};
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::search::SearchEngine;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Fan-out engine, shared by every request
    pub engine: Arc<SearchEngine>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(engine: Arc<SearchEngine>) -> Self {
        Self {
            engine,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .merge(api::search_routes())
        .merge(api::catalog_routes())
        .merge(api::health_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
