//! Error types for store and façade operations.

use thiserror::Error;

/// Errors that can occur during store and façade operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Schema, predicate or coercion failure from rekord-core.
    #[error(transparent)]
    Core(#[from] rekord_core::Error),

    /// Native DB error.
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// RON config or counter file error.
    #[error("RON error: {0}")]
    Ron(String),

    /// A store refused or failed to run a request.
    #[error("Execution failed: {0}")]
    Execution(String),
}

/// Result type for store and façade operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<native_db::db_type::Error> for Error {
    fn from(err: native_db::db_type::Error) -> Self {
        Error::Database(err.to_string())
    }
}

impl From<ron::error::SpannedError> for Error {
    fn from(err: ron::error::SpannedError) -> Self {
        Error::Ron(err.to_string())
    }
}

impl From<ron::Error> for Error {
    fn from(err: ron::Error) -> Self {
        Error::Ron(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
