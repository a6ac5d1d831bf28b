//! Error types for the todo client.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Input rejected before any request was sent
    #[error("{0}")]
    Validation(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("Server error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Token missing, expired or rejected, or credentials invalid
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Persisted session could not be read or written
    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Third-party sign-in is disabled or could not start
    #[error("Sign-in provider not available: {0}")]
    NotConfigured(String),

    /// Authenticated call attempted without a session
    #[error("Not signed in")]
    SignedOut,

    /// The triggering control already has a request in flight
    #[error("Another request is already in progress")]
    Busy,

    #[error("Todo {0} is not in the list")]
    UnknownTodo(u64),
}

impl ClientError {
    /// Message shown to the user in a notification.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api { message, .. } if !message.is_empty() => message.clone(),
            ClientError::Unauthorized(message) | ClientError::NotFound(message) => message.clone(),
            ClientError::Validation(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
