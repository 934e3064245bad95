//! Error types for diagram export operations.

use std::time::Duration;

use thiserror::Error;

/// Primary error type for diagram export operations.
#[derive(Error, Debug)]
pub enum DiaError {
    // Source errors
    #[error("Diagram source not found: {path}")]
    NotFound { path: String },

    #[error("Unknown book: {book}")]
    BookNotFound { book: String },

    #[error("Invalid diagram reference: {0}")]
    InvalidReference(String),

    #[error("Invalid diagram element: {0}")]
    InvalidElement(String),

    // Tool errors
    #[error("{tool}: {detail}")]
    Export { tool: String, detail: String },

    #[error("{tool}: timed out after {timeout:?}")]
    Timeout { tool: String, timeout: Duration },

    // Image errors
    #[error("Failed to read image size of {path}: {reason}")]
    ImageProbe { path: String, reason: String },

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl DiaError {
    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::BookNotFound { .. }
                | Self::InvalidReference(_)
                | Self::InvalidElement(_)
                | Self::ConfigNotFound { .. }
                | Self::ConfigParse(_)
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { .. } => Some("Check the diagram path and --book prefix"),
            Self::BookNotFound { .. } => Some("Add the book root under [books] in the config file"),
            Self::Export { .. } => Some("Ensure dia is installed, or set dia_path in the config file"),
            Self::Timeout { .. } => Some("Raise timeout_secs in the config file"),
            Self::ConfigNotFound { .. } => Some("Create the file or drop --config to use defaults"),
            _ => None,
        }
    }
}

/// Convenience type alias for Results using DiaError.
pub type Result<T> = std::result::Result<T, DiaError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| DiaError::Other(format!("{}: {e}", f().into())))
    }
}
