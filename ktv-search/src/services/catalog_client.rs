//! Upstream karaoke catalog client
//!
//! One GET per (company, strategy) against the catalog's song endpoint. The
//! endpoint answers with a JSON array of song objects, or with HTML / an error
//! status when it is unhappy; both failure shapes are reported as
//! [`CatalogError`] values for the caller to absorb.

use async_trait::async_trait;
use ktv_common::config::UpstreamConfig;
use ktv_common::{RawSongRecord, SearchStrategy};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use std::time::Duration;
use thiserror::Error;

/// Per-request upstream failure
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Upstream returned HTTP {0}")]
    Status(u16),

    #[error("Malformed payload: {0}")]
    Parse(String),

    #[error("Payload is not an array (got {0})")]
    NotAnArray(&'static str),
}

impl CatalogError {
    /// Malformed payloads as opposed to an unreachable service
    pub fn is_malformed(&self) -> bool {
        matches!(self, CatalogError::Parse(_) | CatalogError::NotAnArray(_))
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CatalogError::Timeout
        } else {
            CatalogError::Network(err.to_string())
        }
    }
}

/// Anything that can answer a (company, strategy) catalog query
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(
        &self,
        company: &str,
        strategy: &SearchStrategy,
    ) -> Result<Vec<RawSongRecord>, CatalogError>;
}

/// HTTP client for the catalog service
pub struct CatalogClient {
    http_client: reqwest::Client,
    url: String,
}

impl CatalogClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, CatalogError> {
        let referer = format!("{}/", config.base_url.trim_end_matches('/'));

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-TW,zh;q=0.9,en-US;q=0.8,en;q=0.7"),
        );
        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(
            REFERER,
            HeaderValue::from_str(&referer).map_err(|e| CatalogError::Network(e.to_string()))?,
        );

        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            url: format!(
                "{}{}",
                config.base_url.trim_end_matches('/'),
                config.endpoint
            ),
        })
    }

    /// Full URL of the song endpoint
    pub fn endpoint_url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn fetch(
        &self,
        company: &str,
        strategy: &SearchStrategy,
    ) -> Result<Vec<RawSongRecord>, CatalogError> {
        tracing::debug!(
            company = %company,
            query_type = %strategy.query_type,
            keyword = %strategy.keyword,
            "Querying catalog"
        );

        let response = self
            .http_client
            .get(&self.url)
            .query(&[
                ("company", company),
                ("cusType", strategy.query_type.as_param()),
                ("keyword", strategy.keyword.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_song_list(&body)
    }
}

/// Decode an upstream body into records
///
/// The body must be a JSON array. Elements that are not song objects are
/// skipped one by one rather than failing the whole response.
pub fn parse_song_list(body: &str) -> Result<Vec<RawSongRecord>, CatalogError> {
    let value: serde_json::Value = serde_json::from_str(body.trim_start_matches('\u{feff}'))
        .map_err(|e| CatalogError::Parse(e.to_string()))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Null => return Err(CatalogError::NotAnArray("null")),
        serde_json::Value::Bool(_) => return Err(CatalogError::NotAnArray("boolean")),
        serde_json::Value::Number(_) => return Err(CatalogError::NotAnArray("number")),
        serde_json::Value::String(_) => return Err(CatalogError::NotAnArray("string")),
        serde_json::Value::Object(_) => return Err(CatalogError::NotAnArray("object")),
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<RawSongRecord>(item) {
            Ok(record) => records.push(record),
            Err(e) => tracing::debug!(error = %e, "Skipping malformed catalog entry"),
        }
    }
    Ok(records)
}
