//! Error types for simreport.
//!
//! Library crates use [`SimReportError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all simreport operations.
#[derive(Debug, thiserror::Error)]
pub enum SimReportError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Template could not be read or parsed. Fatal for a run.
    #[error("failed to load template {path:?}: {message}")]
    Load { path: PathBuf, message: String },

    /// Text or parameter extraction failed for a single document.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Model response was not valid structured data.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Final dataset write failed. Fatal for a run.
    #[error("failed to save dataset to {path:?}: {message}")]
    Save { path: PathBuf, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid input (bad argument, unsupported format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SimReportError>;

impl SimReportError {
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

    /// Template load failure at `path`.
    pub fn load(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Dataset save failure at `path`.
    pub fn save(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Save {
            path: path.into(),
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
