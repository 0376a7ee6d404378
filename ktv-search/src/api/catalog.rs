//! Direct catalog lookup
//!
//! One catch-all `searchList` query passed through with light reshaping,
//! for clients that want the raw upstream listing rather than the
//! aggregated view. The list is capped at [`PASSTHROUGH_LIMIT`] entries.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use ktv_common::models::normalize_keyword;
use ktv_common::RawSongRecord;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::services::CatalogError;
use crate::AppState;

/// Maximum entries returned by a passthrough lookup
pub const PASSTHROUGH_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub keyword: Option<String>,
}

/// One upstream record in front-end field names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    #[serde(rename = "歌名")]
    pub name: String,
    #[serde(rename = "歌手")]
    pub singer: String,
    #[serde(rename = "編號")]
    pub code: String,
    #[serde(rename = "公司")]
    pub company: String,
    #[serde(rename = "語言")]
    pub lang: String,
}

impl From<RawSongRecord> for CatalogEntry {
    fn from(record: RawSongRecord) -> Self {
        Self {
            name: record.name,
            singer: record.singer,
            code: record.code,
            company: record.company,
            lang: record.lang,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub success: bool,
    pub data: Vec<CatalogEntry>,
    /// Upstream record count before truncation
    pub total: usize,
    pub source: &'static str,
}

/// GET /api/taiwan-search?keyword=..
pub async fn catalog_lookup(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> ApiResult<Json<CatalogResponse>> {
    let keyword = normalize_keyword(query.keyword.as_deref().unwrap_or_default())?;

    let records = match state.engine.lookup_catch_all(&keyword).await {
        Ok(records) => records,
        Err(CatalogError::NotAnArray(kind)) => {
            tracing::warn!(keyword = %keyword, kind, "Catalog returned a non-array payload");
            Vec::new()
        }
        Err(err) => return Err(ApiError::BadGateway(err.to_string())),
    };

    let total = records.len();
    let data: Vec<CatalogEntry> = records
        .into_iter()
        .take(PASSTHROUGH_LIMIT)
        .map(CatalogEntry::from)
        .collect();

    tracing::info!(keyword = %keyword, total, returned = data.len(), "Catalog lookup");

    Ok(Json(CatalogResponse {
        success: true,
        data,
        total,
        source: "song.corp.com.tw",
    }))
}

/// Build catalog lookup routes
pub fn catalog_routes() -> Router<AppState> {
    Router::new().route("/api/taiwan-search", get(catalog_lookup))
}
