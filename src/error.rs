//! Error types for the retrieval evaluator.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors that can occur while evaluating retrieval quality.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No usable credential could be obtained.
    #[error("Credential error: {0}")]
    Credential(String),

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Search backend returned an error.
    #[error("Search API error: {0}")]
    Search(String),

    /// Embedding backend returned an error or an unexpected vector.
    #[error("Embedding API error: {0}")]
    Embedding(String),

    /// LLM API error.
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// LLM response parsing error.
    #[error("Failed to parse LLM response: {0}")]
    LlmParse(String),

    /// The converter input file does not exist.
    #[error("Input file '{0}' not found")]
    InputNotFound(PathBuf),

    /// Input data has the wrong shape.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// CSV writing error.
    #[error("CSV error: {0}")]
    Csv(String),
}

impl EvalError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for EvalError {
    fn from(err: reqwest::Error) -> Self {
        EvalError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for EvalError {
    fn from(err: serde_json::Error) -> Self {
        EvalError::LlmParse(err.to_string())
    }
}

impl From<csv::Error> for EvalError {
    fn from(err: csv::Error) -> Self {
        EvalError::Csv(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_carries_path() {
        let err = EvalError::io(
            "results.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("results.json"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_input_not_found_display() {
        let err = EvalError::InputNotFound(PathBuf::from("missing.json"));
        assert_eq!(err.to_string(), "Input file 'missing.json' not found");
    }
}
