//! Error types for loadbridge

use thiserror::Error;

/// Result type alias for loadbridge operations
pub type Result<T> = std::result::Result<T, LoadbridgeError>;

/// Main error type for configuration, I/O, and input handling
#[derive(Error, Debug)]
pub enum LoadbridgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Missing environment variable: {0}")]
    MissingVar(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl LoadbridgeError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a parse error for a 1-based input line
    pub fn parse(line: usize, msg: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: msg.into(),
        }
    }
}
