//! Common error types for the pronunciation coach

use thiserror::Error;

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared across crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (serialization, corrupted rows)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for SQLite "database is locked" / "busy" errors, which are worth retrying
    pub fn is_database_locked(&self) -> bool {
        match self {
            #[cfg(feature = "sqlx")]
            Error::Database(e) => {
                let msg = e.to_string().to_lowercase();
                msg.contains("database is locked") || msg.contains("database is busy")
            }
            _ => false,
        }
    }
}
