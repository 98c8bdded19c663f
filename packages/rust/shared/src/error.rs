//! Error types for schemewatch.
//!
//! Library crates use [`SchemeWatchError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all schemewatch operations.
#[derive(Debug, thiserror::Error)]
pub enum SchemeWatchError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during fetch or ingest.
    #[error("network error: {0}")]
    Network(String),

    /// Feed or HTML parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Seen-file (dedup store) error.
    #[error("store error: {0}")]
    Store(String),

    /// Downstream ingest rejected or failed.
    #[error("ingest error: {0}")]
    Ingest(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad source entry, invalid URL, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SchemeWatchError>;

impl SchemeWatchError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = SchemeWatchError::config("missing admin token");
        assert_eq!(err.to_string(), "config error: missing admin token");

        let err = SchemeWatchError::validation("source kind 'ftp' not supported");
        assert!(err.to_string().contains("'ftp' not supported"));
    }
}
