//! Error types for CampusBot.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: configuration, I/O, language-model calls, retrieval,
//! content extraction and session handling.

use thiserror::Error;

/// Unified error type for CampusBot.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// We never panic — errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Language-model provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Vector-service and document-index errors
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Web or PDF extraction errors (network or parse failure)
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Session memory and transcript errors
    #[error("Session error: {0}")]
    Session(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
