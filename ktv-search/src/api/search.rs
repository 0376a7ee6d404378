//! Aggregated song search endpoints
//!
//! Same search exposed two ways: `GET /api/search` with query parameters and
//! `POST /api/live-search` with a JSON body.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use ktv_common::models::normalize_keyword;
use ktv_common::{AggregatedSong, SearchType};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::search::SearchStats;
use crate::AppState;

/// Search input, from either query string or JSON body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// Free-text keyword (required, trimmed)
    pub keyword: Option<String>,
    /// `song`, `singer` or `auto` (default)
    pub search_type: Option<String>,
}

/// Aggregated search response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub success: bool,
    pub keyword: String,
    pub search_type: SearchType,
    pub results: Vec<AggregatedSong>,
    pub total: usize,
    /// True when the search deadline cut the fan-out short
    pub partial: bool,
    pub stats: SearchStats,
    pub timestamp: DateTime<Utc>,
}

/// GET /api/search?keyword=..&searchType=..
pub async fn search_get(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    run_search(&state, params).await
}

/// POST /api/live-search
pub async fn search_post(
    State(state): State<AppState>,
    Json(params): Json<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    run_search(&state, params).await
}

async fn run_search(state: &AppState, params: SearchParams) -> ApiResult<Json<SearchResponse>> {
    let keyword = normalize_keyword(params.keyword.as_deref().unwrap_or_default())?;
    let search_type = SearchType::parse_hint(params.search_type.as_deref())?;

    tracing::info!(keyword = %keyword, search_type = %search_type, "Search request");

    let outcome = state.engine.search(&keyword, search_type).await?;

    Ok(Json(SearchResponse {
        success: true,
        keyword: outcome.keyword,
        search_type: outcome.search_type,
        total: outcome.songs.len(),
        results: outcome.songs,
        partial: outcome.partial,
        stats: outcome.stats,
        timestamp: Utc::now(),
    }))
}

/// Build search routes
pub fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/api/search", get(search_get))
        .route("/api/live-search", post(search_post))
}
