//! Delivery error types.

use letterbox_store::StorageError;
use thiserror::Error;

/// Why a payload could not be placed in an inbox.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// Recipient id could not be normalized into a participant id
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// Target store could not be opened or written
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A fallback transport failed
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type alias using DeliveryError.
pub type DeliveryResult<T> = Result<T, DeliveryError>;
