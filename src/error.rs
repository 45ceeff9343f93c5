//! Error types for faers-fetch
//!
//! Every fallible operation in the crate returns [`Result`]. The variants are
//! split along the lines the harvest loop cares about:
//! - request-level outcomes from the API (`RequestFailed`, `RateLimited`)
//! - cooperative stop (`Cancelled`)
//! - transport, decoding and output failures wrapped from their source crates

use thiserror::Error;

/// Result type alias for faers-fetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for faers-fetch
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api.page_size")
        key: Option<String>,
    },

    /// The API answered with a non-success status other than 429
    #[error("request failed with HTTP {status}: {body}")]
    RequestFailed {
        /// HTTP status code returned by the API
        status: u16,
        /// Response body, kept for the operator report
        body: String,
    },

    /// The API answered with HTTP 429 Too Many Requests
    #[error("rate limit exceeded")]
    RateLimited,

    /// A stop was requested before the operation could run
    #[error("cancelled")]
    Cancelled,

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body was not the expected JSON shape
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Base URL could not be parsed
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// HTTP status carried by this error, if it came from an API response
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RequestFailed { status, .. } => Some(*status),
            Error::RateLimited => Some(429),
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
