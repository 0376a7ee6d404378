//! Multi-keyword batch search
//!
//! Keywords run one after another through the same engine with a pause in
//! between, so a long list does not hammer the catalog. A keyword that fails
//! is recorded and the batch moves on.

use super::engine::SearchEngine;
use ktv_common::{AggregatedSong, Error, Result, SearchType};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Popular singers used by `search --hot-singers`
pub const HOT_SINGERS: [&str; 21] = [
    "周杰倫", "蔡依林", "林俊傑", "張惠妹", "五月天", "鄧紫棋", "林宥嘉", "田馥甄", "楊丞琳",
    "孫燕姿", "梁靜茹", "告五人", "茄子蛋", "持修", "張學友", "劉德華", "鄧麗君", "蔡琴",
    "李宗盛", "伍佰", "張宇",
];

/// Songs found for one keyword of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub keyword: String,
    pub songs: Vec<AggregatedSong>,
    /// The search deadline cut this keyword short
    pub partial: bool,
}

/// Outcome of a whole batch, in keyword order
///
/// Serializes as a `{ keyword: [songs] }` object. Failed keywords are not
/// part of the object.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub entries: Vec<BatchEntry>,
    pub failed: Vec<String>,
}

impl BatchResult {
    pub fn total_songs(&self) -> usize {
        self.entries.iter().map(|e| e.songs.len()).sum()
    }

    pub fn songs_for(&self, keyword: &str) -> Option<&[AggregatedSong]> {
        self.entries
            .iter()
            .find(|e| e.keyword == keyword)
            .map(|e| e.songs.as_slice())
    }
}

impl Serialize for BatchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.keyword, &entry.songs)?;
        }
        map.end()
    }
}

/// Merge keyword sources into one ordered, duplicate-free list
///
/// Order is command-line keywords, then file lines, then the hot singer
/// list. Lines are trimmed; blank lines and `#` comments are skipped.
pub fn collect_keywords(
    keywords: &[String],
    file: Option<&Path>,
    hot_singers: bool,
) -> Result<Vec<String>> {
    let mut candidates: Vec<String> = keywords.to_vec();

    if let Some(path) = file {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidInput(format!("cannot read keywords file {}: {}", path.display(), e))
        })?;
        candidates.extend(content.lines().map(str::to_string));
    }
    if hot_singers {
        candidates.extend(HOT_SINGERS.iter().map(|s| s.to_string()));
    }

    let mut seen = HashSet::new();
    let collected: Vec<String> = candidates
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty() && !k.starts_with('#'))
        .filter(|k| seen.insert(k.to_string()))
        .map(str::to_string)
        .collect();

    if collected.is_empty() {
        return Err(Error::InvalidInput("no keywords given".to_string()));
    }
    Ok(collected)
}

/// Search every keyword in turn, pausing `pause` between consecutive searches
pub async fn run_batch(
    engine: &SearchEngine,
    keywords: &[String],
    search_type: SearchType,
    pause: Duration,
) -> BatchResult {
    let mut result = BatchResult::default();
    info!(keywords = keywords.len(), "Starting batch search");

    for (i, keyword) in keywords.iter().enumerate() {
        info!("Batch progress [{}/{}]: {}", i + 1, keywords.len(), keyword);

        match engine.search(keyword, search_type).await {
            Ok(outcome) => result.entries.push(BatchEntry {
                keyword: outcome.keyword,
                songs: outcome.songs,
                partial: outcome.partial,
            }),
            Err(e) => {
                warn!(keyword = %keyword, error = %e, "Batch keyword failed, continuing");
                result.failed.push(keyword.clone());
            }
        }

        if i + 1 < keywords.len() && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    info!(
        succeeded = result.entries.len(),
        failed = result.failed.len(),
        songs = result.total_songs(),
        "Batch search completed"
    );
    result
}
