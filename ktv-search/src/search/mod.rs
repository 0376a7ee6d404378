//! Search aggregation core
//!
//! keyword → strategies → fan-out over companies → per-response filter →
//! aggregation keyed by (title, singer) → vendor-ordered song list

pub mod aggregator;
pub mod batch;
pub mod engine;
pub mod filter;
pub mod strategy;
pub mod vendor;

pub use aggregator::Aggregator;
pub use batch::{collect_keywords, run_batch, BatchEntry, BatchResult, HOT_SINGERS};
pub use engine::{EngineSettings, FanOutJob, SearchEngine, SearchOutcome, SearchStats};
pub use filter::KeywordFilter;
pub use strategy::generate_strategies;
pub use vendor::VendorPriority;
