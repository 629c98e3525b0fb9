//! Errors surfaced by the service layer.

use thiserror::Error;

use crate::{dao::storage::StorageError, state::state_machine::InvalidTransition};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// No storage backend is installed, or the installed one failed its health check.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// The command is not valid for the chat, the caller or the game phase.
    #[error("rejected: {0}")]
    Rejected(Rejection),
}

/// Validation failures reported back to the chat; none of them mutates state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// A group command was issued outside a group.
    #[error("command is only available in group chats")]
    GroupOnly,
    /// Updates from channels and other unsupported chat kinds.
    #[error("chat type is not supported")]
    UnsupportedChat,
    /// An admin-only command was issued by a regular member.
    #[error("caller is not a chat administrator")]
    NotAdmin,
    /// `/start` arguments are missing or malformed.
    #[error("expected `/start <currency> <amount>`")]
    StartUsage,
    /// The command does not apply to the game's current phase.
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<Rejection> for ServiceError {
    fn from(rejection: Rejection) -> Self {
        ServiceError::Rejected(rejection)
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::Rejected(Rejection::Transition(err))
    }
}
