//! Error types for client, registration, and session operations.

use letterbox_config_and_utils::CoreError;
use letterbox_store::StorageError;
use thiserror::Error;

/// Errors from a single client instance.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Local store failure. Fatal to the operation that hit it.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid participant id or configuration.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias using ClientError.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors from the identity registration call.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Network or transport-level HTTP error from reqwest.
    ///
    /// Includes connection failures and timeouts.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Registration service answered with a status other than 2xx or 409.
    #[error("Registration rejected: {status} - {message}")]
    Rejected {
        /// The HTTP status code returned by the service.
        status: u16,
        /// The response body.
        message: String,
    },
}

/// Result type alias using RegistrationError.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Errors surfaced to collaborators of [`SessionRegistry`](crate::SessionRegistry).
#[derive(Debug, Error)]
pub enum SessionError {
    /// No active session for the caller.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Missing or invalid id, recipient, or payload.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias using SessionError.
pub type SessionResult<T> = Result<T, SessionError>;

impl From<ClientError> for SessionError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Storage(e) => SessionError::Storage(e),
            ClientError::Core(e) => SessionError::BadRequest(e.to_string()),
        }
    }
}
