//! Common error types for the KTV search service

use thiserror::Error;

/// Common result type for KTV operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the search engine and its front ends
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal failure that indicates a defect rather than an upstream condition
    #[error("Internal error: {0}")]
    Internal(String),
}
