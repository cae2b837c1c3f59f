//! Error types for the Lectern course assistant.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: configuration, I/O, document parsing, the vector
//! index, LLM generation, and tool dispatch.

use thiserror::Error;

/// Unified error type for the Lectern course assistant.
///
/// All functions in the application return `Result<T, AppError>`.
/// We never panic — errors must be represented and propagated.
///
/// Retrieval misses (empty catalog, unresolved course name) are deliberately
/// NOT variants here: they are folded into the search result as plain
/// strings so the model can see and react to them.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed course document (missing or bad header lines)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Vector index and catalog errors
    #[error("Index error: {0}")]
    Index(String),

    /// LLM and embedding provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Tool registry dispatch errors (unregistered tool name)
    #[error("Tool error: {0}")]
    Tool(String),

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
