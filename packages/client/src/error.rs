//! Error types for the chat client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Username is already used by another active session
    #[error("Username '{0}' is already in use")]
    DuplicateUsername(String),

    /// The server rejected the username
    #[error("Username '{0}' was rejected by the server")]
    InvalidUsername(String),

    /// The server closed the connection with a close code
    #[error("Server closed the connection ({code}): {reason}")]
    Closed { code: u16, reason: String },

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to encode an outgoing frame
    #[error("Failed to encode message: {0}")]
    Encode(String),
}
