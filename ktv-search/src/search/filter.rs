//! Relevance filtering of upstream records
//!
//! Substring windows and the new/hot listings return plenty of songs that do
//! not actually match; only records whose title and/or singer contain the
//! original keyword survive. Matching is Unicode lowercase folding, which
//! leaves CJK text untouched.

use ktv_common::{RawSongRecord, SearchType};

/// Case-insensitive matcher for one keyword and search type
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    needle: String,
    search_type: SearchType,
}

impl KeywordFilter {
    pub fn new(keyword: &str, search_type: SearchType) -> Self {
        Self {
            needle: keyword.to_lowercase(),
            search_type,
        }
    }

    /// Whether one record matches under the configured search type
    pub fn matches(&self, record: &RawSongRecord) -> bool {
        let by_name = || contains_folded(&record.name, &self.needle);
        let by_singer = || contains_folded(&record.singer, &self.needle);

        match self.search_type {
            SearchType::Song => by_name(),
            SearchType::Singer => by_singer(),
            SearchType::Auto => by_name() || by_singer(),
        }
    }

    /// Keep only matching records, preserving order
    pub fn apply(&self, records: Vec<RawSongRecord>) -> Vec<RawSongRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

fn contains_folded(haystack: &str, folded_needle: &str) -> bool {
    haystack.to_lowercase().contains(folded_needle)
}
