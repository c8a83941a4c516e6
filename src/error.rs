//! Error types for the query engine.
//!
//! Every failure the engine can produce is one of these variants. They are
//! recovered at the executor and service boundaries and reported as data.

use thiserror::Error;

/// Main error type for query engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Unsafe or malformed SQL, or a table name outside the safe character set.
    #[error("{0}")]
    Validation(String),

    /// Could not reach or authenticate to the target database.
    #[error("{0}")]
    Connection(String),

    /// The target database rejected or failed the statement after connecting.
    #[error("{0}")]
    Execution(String),

    /// The configured database kind is not one of the supported dialects.
    #[error("Unsupported database type: {0}")]
    UnsupportedDialect(String),

    /// The requested data source does not exist or belongs to someone else.
    #[error("Data source {0} not found")]
    NotFound(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (cache serialization, unexpected states).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates an unsupported-dialect error for the given kind name.
    pub fn unsupported_dialect(kind: impl Into<String>) -> Self {
        Self::UnsupportedDialect(kind.into())
    }

    /// Creates a not-found error for the given data source identifier.
    pub fn not_found(id: impl ToString) -> Self {
        Self::NotFound(id.to_string())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation Error",
            Self::Connection(_) => "Connection Error",
            Self::Execution(_) => "Execution Error",
            Self::UnsupportedDialect(_) => "Unsupported Dialect",
            Self::NotFound(_) => "Not Found",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// HTTP-equivalent status code the calling layer should map this error to.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_)
            | Self::UnsupportedDialect(_)
            | Self::Connection(_)
            | Self::Execution(_) => 400,
            Self::NotFound(_) => 404,
            Self::Config(_) | Self::Internal(_) => 500,
        }
    }
}

/// Result type alias using EngineError.
pub type Result<T> = std::result::Result<T, EngineError>;
