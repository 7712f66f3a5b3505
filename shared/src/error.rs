//! Error types for the tour schedule proxy.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while proxying a schedule request.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller did not supply upstream credentials
    #[error("Username and password are required")]
    MissingCredentials,

    /// Unsupported HTTP method
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Upstream API answered with a non-success status
    #[error("RocketRez API error: {status} {status_text}")]
    Upstream {
        status: u16,
        status_text: String,
        details: String,
        url: String,
    },

    /// Network or body read failure talking to the upstream API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::MissingCredentials => 400,
            Error::MethodNotAllowed(_) => 405,
            Error::Upstream { status, .. } => *status,
            _ => 500,
        }
    }
}
