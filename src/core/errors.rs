//! Shared error types for the crate surface
//!
//! The matching engine itself never signals "no match" through errors; a
//! fragment without a counterpart simply stays in the non-mapped lists.
//! These errors cover the crate boundary: reading and parsing source files,
//! configuration, and report output.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for diffmap operations
#[derive(Debug, Error)]
pub enum Error {
    /// Parsing errors from the compiler front end
    #[error("Parse error in {file}: {message}")]
    Parse { file: PathBuf, message: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a parse error with file context
    pub fn parse(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
        }
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;
