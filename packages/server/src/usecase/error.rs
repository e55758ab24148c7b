//! UseCase layer errors.

use thiserror::Error;

use crate::domain::{RepositoryError, ValueObjectError};

/// Errors answered to the originating connection as an `error` frame
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollabError {
    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),

    #[error("Invalid payload for '{message_type}': {reason}")]
    SchemaValidationFailed { message_type: String, reason: String },

    #[error("Room '{0}' not found")]
    RoomNotFound(String),

    #[error("Room '{0}' already exists")]
    RoomAlreadyExists(String),

    #[error("Permission denied: '{0}' requires publisher rights")]
    PermissionDenied(String),

    #[error("Not in a room")]
    NotInRoom,

    #[error("Participant '{0}' not found")]
    ParticipantNotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CollabError {
    /// A field value rejected by a value object
    pub fn invalid_field(message_type: &str, error: ValueObjectError) -> Self {
        CollabError::SchemaValidationFailed {
            message_type: message_type.to_string(),
            reason: error.to_string(),
        }
    }
}

impl From<RepositoryError> for CollabError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::RoomNotFound(id) => CollabError::RoomNotFound(id),
            RepositoryError::RoomAlreadyExists(id) => CollabError::RoomAlreadyExists(id),
            RepositoryError::ParticipantNotFound(id) => CollabError::ParticipantNotFound(id),
            RepositoryError::ConnectionNotFound(id) => {
                CollabError::Internal(format!("connection '{}' is not registered", id))
            }
        }
    }
}
