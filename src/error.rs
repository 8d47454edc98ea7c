//! Error types for the conversational memory

use thiserror::Error;

/// Result type alias for memory operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the memory subsystem and its collaborators
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected input (unknown profile key, wrong value kind, empty text)
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Database pool or connection unavailable
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Language model collaborator error
    #[error("language model error: {0}")]
    Llm(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether the underlying storage medium failed
    ///
    /// Callers may continue without persistence after a storage error; the
    /// store stays usable for subsequent calls.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Sqlite(_) | Self::Io(_))
    }

    /// Whether the error was caused by the caller's input
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<r2d2::Error> for Error {
    fn from(e: r2d2::Error) -> Self {
        Self::Database(e.to_string())
    }
}
