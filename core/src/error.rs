//! Error taxonomy for the Roamly API client.
//!
//! # Design
//! Callers must be able to tell "the server said no" (`Server`) apart from
//! "the server said yes but the payload was unreadable" (`Decoding`), so the
//! two never collapse into a single catch-all variant.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The path and base URL could not be resolved to a valid request target.
    #[error("invalid request URL: {0}")]
    InvalidRequest(String),

    /// The server answered with a status outside 200..=299.
    #[error("{}", server_display(.status, .message))]
    Server { status: u16, message: Option<String> },

    /// A 2xx body could not be decoded into the expected shape.
    #[error("failed to parse server response: {0}")]
    Decoding(#[source] serde_json::Error),

    /// The request payload could not be serialized to JSON.
    #[error("failed to encode request body: {0}")]
    Encoding(#[source] serde_json::Error),

    /// The transport failed before any HTTP response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// The transport produced something that is not an HTTP response.
    #[error("unknown error")]
    Unknown,
}

impl ApiError {
    /// HTTP status carried by a `Server` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human-readable message the server attached to a `Server` error.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

fn server_display(status: &u16, message: &Option<String>) -> String {
    match message {
        Some(message) => message.clone(),
        None => format!("server error ({status})"),
    }
}
