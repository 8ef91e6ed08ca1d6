//! Error types for minimail.

use thiserror::Error;

/// Common error type for minimail.
#[derive(Error, Debug)]
pub enum MailError {
    /// I/O error on a socket or file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Durable log could not be read or written.
    ///
    /// Carries the path and the underlying cause so the handler that reports
    /// the failure to the peer can also log something useful.
    #[error("storage error: {0}")]
    Storage(String),

    /// Authentication rejected by the retrieval server.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Peer answered with something other than what the protocol allows here.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Validation error for account data or configuration text.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MailError {
    /// Wrap an I/O failure on a durable log together with its path.
    pub fn storage(path: &std::path::Path, err: std::io::Error) -> Self {
        MailError::Storage(format!("{}: {err}", path.display()))
    }
}

/// Result type alias for minimail operations.
pub type Result<T> = std::result::Result<T, MailError>;
