//! Clients for external services

pub mod catalog_client;

pub use catalog_client::{CatalogClient, CatalogError, CatalogSource};
