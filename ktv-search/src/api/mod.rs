//! HTTP API handlers for ktv-search

pub mod catalog;
pub mod health;
pub mod search;

pub use catalog::catalog_routes;
pub use health::health_routes;
pub use search::search_routes;
