//! Song data model
//!
//! Raw records as returned by the upstream catalog, the search hints and
//! strategies that drive the fan-out, and the aggregated songs returned to
//! callers.
//!
//! Aggregated songs serialize with the field names the karaoke front end
//! already consumes (`歌名`, `歌手`, `語言`, `編號資訊`).

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Upstream records
// ============================================================================

/// One catalog entry as returned by the upstream song endpoint
///
/// Every field is optional on the wire. Numbers are accepted where strings
/// are expected (some vendors publish numeric codes) and `null` becomes an
/// empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawSongRecord {
    /// Song title
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    /// Performer
    #[serde(default, deserialize_with = "lenient_string")]
    pub singer: String,
    /// Vendor-specific song number
    #[serde(default, deserialize_with = "lenient_string")]
    pub code: String,
    /// Vendor (karaoke company) name
    #[serde(default, deserialize_with = "lenient_string")]
    pub company: String,
    /// Language label, often empty
    #[serde(default, deserialize_with = "lenient_string")]
    pub lang: String,
}

impl RawSongRecord {
    pub fn new(name: &str, singer: &str, code: &str, company: &str) -> Self {
        Self {
            name: name.to_string(),
            singer: singer.to_string(),
            code: code.to_string(),
            company: company.to_string(),
            lang: String::new(),
        }
    }

    pub fn with_lang(mut self, lang: &str) -> Self {
        self.lang = lang.to_string();
        self
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

// ============================================================================
// Search hints and strategies
// ============================================================================

/// Which field the caller expects the keyword to match
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// Match against the song title
    Song,
    /// Match against the performer
    Singer,
    /// Match against either field
    #[default]
    Auto,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Song => "song",
            SearchType::Singer => "singer",
            SearchType::Auto => "auto",
        }
    }

    /// True when title matches are relevant (song or auto)
    pub fn includes_song(&self) -> bool {
        matches!(self, SearchType::Song | SearchType::Auto)
    }

    /// True when performer matches are relevant (singer or auto)
    pub fn includes_singer(&self) -> bool {
        matches!(self, SearchType::Singer | SearchType::Auto)
    }

    /// Parse an optional hint, falling back to `auto` when absent or blank
    pub fn parse_hint(hint: Option<&str>) -> Result<Self> {
        match hint.map(str::trim) {
            None | Some("") => Ok(SearchType::Auto),
            Some(value) => value.parse(),
        }
    }
}

impl FromStr for SearchType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "song" => Ok(SearchType::Song),
            "singer" => Ok(SearchType::Singer),
            "auto" => Ok(SearchType::Auto),
            other => Err(Error::InvalidInput(format!(
                "unknown search type '{}' (expected song, singer or auto)",
                other
            ))),
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream query type (`cusType` parameter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryType {
    /// Plain catalog search, sent upstream as `searchList`
    SongSearch,
    /// Recently added songs
    NewSong,
    /// Popular songs
    HotSong,
}

impl QueryType {
    /// Value sent in the upstream `cusType` query parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            QueryType::SongSearch => "searchList",
            QueryType::NewSong => "newSong",
            QueryType::HotSong => "hotSong",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryType::SongSearch => "songSearch",
            QueryType::NewSong => "newSong",
            QueryType::HotSong => "hotSong",
        };
        f.write_str(name)
    }
}

/// One concrete (query type, keyword) pair sent upstream
///
/// Identity is the pair itself; the generator never emits the same pair twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SearchStrategy {
    pub query_type: QueryType,
    pub keyword: String,
}

impl SearchStrategy {
    pub fn new(query_type: QueryType, keyword: impl Into<String>) -> Self {
        Self {
            query_type,
            keyword: keyword.into(),
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.query_type, self.keyword)
    }
}

/// Trim a caller-supplied keyword and reject blank input
pub fn normalize_keyword(raw: &str) -> Result<String> {
    let keyword = raw.trim();
    if keyword.is_empty() {
        return Err(Error::InvalidInput("keyword must not be empty".to_string()));
    }
    Ok(keyword.to_string())
}

// ============================================================================
// Aggregated output
// ============================================================================

/// A vendor's number for one song
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct VendorCode {
    #[serde(rename = "公司")]
    pub vendor: String,
    #[serde(rename = "編號")]
    pub code: String,
}

impl VendorCode {
    pub fn new(vendor: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            code: code.into(),
        }
    }
}

/// One logical song merged across vendors, keyed by (name, singer)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AggregatedSong {
    #[serde(rename = "歌名")]
    pub name: String,
    #[serde(rename = "歌手")]
    pub singer: String,
    #[serde(rename = "語言")]
    pub language: String,
    /// Unique by (vendor, code), ordered by vendor priority once finalized
    #[serde(rename = "編號資訊")]
    pub vendor_codes: Vec<VendorCode>,
}

impl AggregatedSong {
    pub fn new(name: &str, singer: &str, language: &str) -> Self {
        Self {
            name: name.to_string(),
            singer: singer.to_string(),
            language: language.to_string(),
            vendor_codes: Vec::new(),
        }
    }

    /// Append a vendor code unless the exact pair is already present
    ///
    /// Returns true when the code was added.
    pub fn add_code(&mut self, vendor: &str, code: &str) -> bool {
        let exists = self
            .vendor_codes
            .iter()
            .any(|vc| vc.vendor == vendor && vc.code == code);
        if exists {
            return false;
        }
        self.vendor_codes.push(VendorCode::new(vendor, code));
        true
    }
}
