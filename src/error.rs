//! Error types for the rendering client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the rendering service
#[derive(Error, Debug)]
pub enum Error {
    /// A required parameter is missing, or mutually exclusive parameters
    /// were both (or neither) supplied. Raised before any I/O.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The health check failed while constructing a client
    #[error("Ichabod not found at {url}")]
    ServiceUnavailable { url: String },

    /// Network failure, timeout, or non-success status
    #[error("Transport error: {0}")]
    TransportError(#[from] reqwest::Error),

    /// The response body was not valid JSON
    #[error("Failed to decode response: {0}")]
    DecodeError(#[from] serde_json::Error),

    /// The temporary output file could not be reserved
    #[error("Failed to reserve output file: {0}")]
    OutputFileError(#[source] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl Error {
    /// True when the underlying transport failure was a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::TransportError(e) if e.is_timeout())
    }
}
