//! Common error types for Prism

use thiserror::Error;

/// Common result type for Prism operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Prism crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Fixture archive could not be downloaded
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Fixture archive could not be opened or unpacked
    #[error("Archive error: {0}")]
    Archive(String),

    /// Provisioning finished without producing fixture data (strict mode only)
    #[error("Fixture data missing: {0}")]
    FixturesMissing(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
