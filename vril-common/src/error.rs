//! Common error types for Vril

use thiserror::Error;

/// Common result type for Vril operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the tracker services
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

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing or invalid credentials
    #[error("Unauthorized: {0}")]
    Auth(String),

    /// Valid credentials, insufficient permission
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Upstream service returned a failure
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status code this error maps to at the API boundary
    pub fn status(&self) -> u16 {
        match self {
            Error::InvalidInput(_) => 400,
            Error::Auth(_) => 401,
            Error::Forbidden(_) => 403,
            Error::NotFound(_) => 404,
            Error::Database(_)
            | Error::Io(_)
            | Error::Config(_)
            | Error::Upstream(_)
            | Error::Internal(_) => 500,
        }
    }
}
