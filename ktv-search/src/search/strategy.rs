//! Search strategy generation
//!
//! Turns one keyword into the list of upstream queries worth issuing. The
//! upstream only matches whole substrings, so besides the full keyword every
//! two-character window is queried as well; relevance filtering afterwards
//! discards the noise this brings in.

use ktv_common::{QueryType, SearchStrategy, SearchType};
use std::collections::HashSet;

/// Window length for substring strategies, in characters
const WINDOW: usize = 2;

/// Build the ordered, duplicate-free strategy list for a keyword
///
/// `keyword` is expected to be trimmed and non-empty. The song branch runs
/// before the singer branch; the first occurrence of a (type, keyword) pair
/// wins.
pub fn generate_strategies(keyword: &str, search_type: SearchType) -> Vec<SearchStrategy> {
    let mut candidates = Vec::new();

    if search_type.includes_song() {
        candidates.push(SearchStrategy::new(QueryType::SongSearch, keyword));
        candidates.push(SearchStrategy::new(QueryType::NewSong, keyword));
        candidates.extend(window_strategies(keyword));
    }

    if search_type.includes_singer() {
        candidates.push(SearchStrategy::new(QueryType::SongSearch, keyword));
        candidates.push(SearchStrategy::new(QueryType::HotSong, keyword));
        candidates.extend(window_strategies(keyword));
    }

    dedup_strategies(candidates)
}

/// Every contiguous two-character window, tagged as a plain song search
///
/// Keywords of two characters or fewer produce nothing.
pub fn window_strategies(keyword: &str) -> Vec<SearchStrategy> {
    let chars: Vec<char> = keyword.chars().collect();
    if chars.len() <= WINDOW {
        return Vec::new();
    }

    chars
        .windows(WINDOW)
        .map(|w| SearchStrategy::new(QueryType::SongSearch, w.iter().collect::<String>()))
        .collect()
}

/// Drop repeated strategies, keeping first occurrences in order
pub fn dedup_strategies(strategies: Vec<SearchStrategy>) -> Vec<SearchStrategy> {
    let mut seen = HashSet::with_capacity(strategies.len());
    strategies
        .into_iter()
        .filter(|s| seen.insert(s.clone()))
        .collect()
}
