//! Unified error type for the call graph service.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CallGraphError {
    #[error("SQLite error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bad client input: missing file role, malformed form, bad namespace.
    #[error("{0}")]
    InvalidInput(String),

    /// Request body larger than the configured upload limit.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// A record that the caller expected to exist is missing.
    #[error("{0}")]
    NotFound(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl CallGraphError {
    /// Stable, machine-readable kind reported to HTTP clients next to the
    /// human-readable message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid-input",
            Self::PayloadTooLarge(_) => "payload-too-large",
            Self::Csv(_) => "csv",
            Self::NotFound(_) => "not-found",
            Self::Database(_) => "database",
            Self::Io(_) => "io",
            Self::Json(_) | Self::Config(_) | Self::Other(_) => "internal",
        }
    }

    /// Whether the error was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::Csv(_) | Self::NotFound(_) | Self::PayloadTooLarge(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CallGraphError>;
