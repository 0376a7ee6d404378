//! # KTV Common Library
//!
//! Shared code for the karaoke catalog search service:
//! - Song data model (raw upstream records, aggregated songs, strategies)
//! - Configuration loading and layering
//! - Common error type

pub mod config;
pub mod error;
pub mod models;

pub use error::{Error, Result};
pub use models::{
    AggregatedSong, QueryType, RawSongRecord, SearchStrategy, SearchType, VendorCode,
};
