//! Error types for the chat service client.

use thiserror::Error;

/// Chat service error type.
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP request failed or the body could not be decoded.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The base URL cannot have path segments appended.
    #[error("Base URL cannot be used for endpoints: {0}")]
    CannotBeABase(String),

    /// The service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the service.
        message: String,
    },
}

impl ApiError {
    /// Short classification used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(e) if e.is_decode() => "decode",
            Self::Http(_) => "transport",
            Self::InvalidUrl(_) | Self::CannotBeABase(_) => "url",
            Self::Api { .. } => "status",
        }
    }
}

/// Result type alias for chat service operations.
pub type Result<T> = std::result::Result<T, ApiError>;
