//! Cross-source song aggregation
//!
//! Records from every fan-out request are merged into one entry per
//! (title, singer). Each entry collects the distinct (vendor, code) pairs seen
//! for it. The aggregator is owned by a single search and is consumed by
//! [`Aggregator::finish`], so it cannot outlive or be shared across searches.

use super::vendor::VendorPriority;
use ktv_common::{AggregatedSong, RawSongRecord};
use std::collections::HashMap;

type SongKey = (String, String);

/// Accumulates songs in first-seen order
#[derive(Debug, Default)]
pub struct Aggregator {
    index: HashMap<SongKey, usize>,
    songs: Vec<AggregatedSong>,
    dropped: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one record
    ///
    /// Fields are trimmed first. Records without a title or singer cannot be
    /// keyed and are dropped.
    pub fn push(&mut self, record: &RawSongRecord) {
        let name = record.name.trim();
        let singer = record.singer.trim();
        if name.is_empty() || singer.is_empty() {
            self.dropped += 1;
            return;
        }

        let lang = record.lang.trim();
        let key = (name.to_string(), singer.to_string());
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.songs.push(AggregatedSong::new(name, singer, lang));
                self.index.insert(key, self.songs.len() - 1);
                self.songs.len() - 1
            }
        };

        let song = &mut self.songs[slot];
        if song.language.is_empty() && !lang.is_empty() {
            song.language = lang.to_string();
        }

        let code = record.code.trim();
        let company = record.company.trim();
        if !code.is_empty() && !company.is_empty() {
            song.add_code(company, code);
        }
    }

    pub fn extend<'a>(&mut self, records: impl IntoIterator<Item = &'a RawSongRecord>) {
        for record in records {
            self.push(record);
        }
    }

    /// Number of distinct songs so far
    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Records rejected for a missing title or singer
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Sort every song's vendor codes and release the songs in first-seen order
    pub fn finish(self, priority: &VendorPriority) -> Vec<AggregatedSong> {
        let mut songs = self.songs;
        for song in &mut songs {
            priority.sort(&mut song.vendor_codes);
        }
        songs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ktv_common::VendorCode;

    fn rec(name: &str, singer: &str, code: &str, company: &str) -> RawSongRecord {
        RawSongRecord::new(name, singer, code, company)
    }

    #[test]
    fn test_merges_by_name_and_singer() {
        let mut agg = Aggregator::new();
        agg.push(&rec("愛情故事", "S1", "B2", "好樂迪"));
        agg.push(&rec("愛情故事", "S1", "A1", "錢櫃"));
        agg.push(&rec("愛情故事", "S9", "C3", "錢櫃"));

        let songs = agg.finish(&VendorPriority::default());
        assert_eq!(songs.len(), 2);
        assert_eq!(
            songs[0].vendor_codes,
            vec![VendorCode::new("錢櫃", "A1"), VendorCode::new("好樂迪", "B2")]
        );
        assert_eq!(songs[1].singer, "S9");
    }

    #[test]
    fn test_duplicate_vendor_code_counted_once() {
        let mut agg = Aggregator::new();
        agg.push(&rec("晴天", "周杰倫", "12345", "錢櫃"));
        agg.push(&rec("晴天", "周杰倫", "12345", "錢櫃"));
        agg.push(&rec(" 晴天 ", "周杰倫 ", " 12345", "錢櫃"));

        let songs = agg.finish(&VendorPriority::default());
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].vendor_codes.len(), 1);
    }

    #[test]
    fn test_language_filled_from_later_record() {
        let mut agg = Aggregator::new();
        agg.push(&rec("晴天", "周杰倫", "1", "錢櫃"));
        agg.push(&rec("晴天", "周杰倫", "2", "銀櫃").with_lang("國語"));
        agg.push(&rec("晴天", "周杰倫", "3", "音圓").with_lang("台語"));

        let songs = agg.finish(&VendorPriority::default());
        assert_eq!(songs[0].language, "國語");
    }

    #[test]
    fn test_records_without_code_or_company_still_create_song() {
        let mut agg = Aggregator::new();
        agg.push(&rec("晴天", "周杰倫", "", "錢櫃"));
        agg.push(&rec("晴天", "周杰倫", "1", ""));

        let songs = agg.finish(&VendorPriority::default());
        assert_eq!(songs.len(), 1);
        assert!(songs[0].vendor_codes.is_empty());
    }

    #[test]
    fn test_unkeyable_records_dropped() {
        let mut agg = Aggregator::new();
        agg.push(&rec("", "周杰倫", "1", "錢櫃"));
        agg.push(&rec("晴天", "  ", "1", "錢櫃"));

        assert!(agg.is_empty());
        assert_eq!(agg.dropped(), 2);
    }

    #[test]
    fn test_vendor_codes_independent_of_arrival_order() {
        let records = vec![
            rec("愛情", "S", "9", "Vx"),
            rec("愛情", "S", "5", "音圓"),
            rec("愛情", "S", "1", "錢櫃"),
            rec("愛情", "S", "1", "錢櫃"),
            rec("愛情", "S", "7", "好樂迪"),
        ];

        let mut forward = Aggregator::new();
        forward.extend(records.iter());
        let mut backward = Aggregator::new();
        backward.extend(records.iter().rev());

        let priority = VendorPriority::default();
        let a = forward.finish(&priority);
        let b = backward.finish(&priority);
        assert_eq!(a, b);
        assert_eq!(
            a[0].vendor_codes
                .iter()
                .map(|c| c.vendor.as_str())
                .collect::<Vec<_>>(),
            vec!["錢櫃", "好樂迪", "音圓", "Vx"]
        );
    }
}
