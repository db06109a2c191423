//! Error types for meshlod

use thiserror::Error;

/// Main error type for meshlod operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for building an [`Error::InvalidMesh`]
    pub fn invalid_mesh(msg: impl Into<String>) -> Self {
        Error::InvalidMesh(msg.into())
    }

    /// Returns true when the error reports malformed input geometry
    pub fn is_invalid_mesh(&self) -> bool {
        matches!(self, Error::InvalidMesh(_))
    }
}

/// Result type alias for meshlod operations
pub type Result<T> = std::result::Result<T, Error>;
