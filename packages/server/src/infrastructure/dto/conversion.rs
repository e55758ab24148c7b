//! Conversion logic between DTOs and domain entities.

use tsudoi_shared::time::timestamp_to_rfc3339;

use crate::{
    domain::{Participant, Room},
    infrastructure::dto::{http, websocket as dto},
    usecase::CollabError,
};

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&Participant> for dto::ParticipantInfo {
    fn from(model: &Participant) -> Self {
        Self {
            id: model.id.as_str().to_string(),
            name: model.name.clone(),
            is_publisher: model.is_publisher,
        }
    }
}

impl From<Participant> for dto::ParticipantInfo {
    fn from(model: Participant) -> Self {
        Self {
            id: model.id.into_string(),
            name: model.name,
            is_publisher: model.is_publisher,
        }
    }
}

impl From<&Room> for http::RoomSummaryDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.as_str().to_string(),
            name: room.name.clone(),
            participant_count: room.participant_count(),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
        }
    }
}

impl From<Room> for http::RoomDetailDto {
    fn from(room: Room) -> Self {
        let participants = participant_infos(&room);
        Self {
            id: room.id.into_string(),
            name: room.name,
            participants,
            metadata: room.metadata,
            created_at: timestamp_to_rfc3339(room.created_at.value()),
        }
    }
}

/// Participants of a room in join order
pub fn participant_infos(room: &Room) -> Vec<dto::ParticipantInfo> {
    room.participants_sorted()
        .into_iter()
        .map(dto::ParticipantInfo::from)
        .collect()
}

// ========================================
// UseCase Error → DTO
// ========================================

impl From<&CollabError> for dto::ErrorCode {
    fn from(error: &CollabError) -> Self {
        match error {
            CollabError::InvalidMessageFormat(_) => dto::ErrorCode::InvalidMessageFormat,
            CollabError::SchemaValidationFailed { .. } => dto::ErrorCode::SchemaValidationFailed,
            CollabError::RoomNotFound(_) => dto::ErrorCode::RoomNotFound,
            CollabError::RoomAlreadyExists(_) => dto::ErrorCode::RoomAlreadyExists,
            CollabError::PermissionDenied(_) => dto::ErrorCode::PermissionDenied,
            CollabError::NotInRoom => dto::ErrorCode::NotInRoom,
            CollabError::ParticipantNotFound(_) => dto::ErrorCode::ParticipantNotFound,
            CollabError::Internal(_) => dto::ErrorCode::InternalError,
        }
    }
}

/// Build the `error` frame answered to the originating connection
pub fn error_frame(
    error: &CollabError,
    message_type: Option<&str>,
    timestamp: i64,
) -> dto::ServerMessage {
    let message_type = match error {
        CollabError::SchemaValidationFailed { message_type, .. } => Some(message_type.clone()),
        _ => message_type.map(str::to_string),
    };
    dto::ServerMessage::Error {
        code: error.into(),
        message: error.to_string(),
        message_type,
        timestamp,
    }
}
