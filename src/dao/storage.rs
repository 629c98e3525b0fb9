//! Backend-agnostic storage errors.

use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not serve the request (network, driver or decoding failure).
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What the backend was doing.
        message: String,
        /// Backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A participant was written for a chat that has no game row.
    #[error("no game registered for chat {chat_id}")]
    MissingGame {
        /// Chat without a game row.
        chat_id: i64,
    },
    /// A stored document could not be mapped back into a domain entity.
    #[error("corrupted record for chat {chat_id}: {reason}")]
    Corrupted {
        /// Chat owning the record.
        chat_id: i64,
        /// Why decoding failed.
        reason: String,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
