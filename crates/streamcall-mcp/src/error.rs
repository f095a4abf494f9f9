//! MCP client error types.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for MCP client operations.
pub type McpResult<T> = Result<T, McpError>;

/// Errors that can occur while talking to an MCP endpoint.
#[derive(Debug, Error)]
pub enum McpError {
    /// The server answered with a non-2xx status.
    #[error("Server returned {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },

    /// A JSON response body was empty or could not be parsed.
    #[error("Malformed JSON response: {body:?}")]
    MalformedJson { body: String },

    /// An SSE response carried no usable `data:` line.
    #[error("SSE stream returned no usable data block")]
    EmptySseStream,

    /// The selected SSE `data:` value was not valid JSON.
    #[error("Invalid SSE data: {raw:?}")]
    MalformedSse { raw: String },

    /// The `Content-Type` header could not be interpreted.
    #[error("Unsupported Content-Type: {0}")]
    UnsupportedContentType(String),

    /// An operation was called out of sequence.
    #[error("Cannot {operation} while client is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// The initialize handshake failed.
    #[error("Handshake failed: {0}")]
    Handshake(#[source] Box<McpError>),

    /// Session teardown failed. Only ever logged.
    #[error("Error closing MCP session: {0}")]
    Teardown(#[source] Box<McpError>),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A round-trip exceeded the configured timeout.
    #[error("Server timeout")]
    Timeout,

    /// A round-trip was aborted through the cancellation token.
    #[error("Request cancelled")]
    Cancelled,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl McpError {
    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Wrap an error raised during the initialize handshake.
    pub fn handshake(cause: McpError) -> Self {
        match cause {
            Self::Handshake(_) => cause,
            other => Self::Handshake(Box::new(other)),
        }
    }

    /// Wrap an error raised while tearing the session down.
    pub fn teardown(cause: McpError) -> Self {
        Self::Teardown(Box::new(cause))
    }

    /// HTTP status of the failing response, if the error carries one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Handshake(inner) | Self::Teardown(inner) => inner.status(),
            _ => None,
        }
    }
}
