//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::Metadata;

use super::websocket::ParticipantInfo;

/// `GET /api/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
}

/// One entry of `GET /api/rooms`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub id: String,
    pub name: String,
    pub participant_count: usize,
    /// RFC 3339 (UTC)
    pub created_at: String,
}

/// `GET /api/rooms/{room_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetailDto {
    pub id: String,
    pub name: String,
    pub participants: Vec<ParticipantInfo>,
    pub metadata: Metadata,
    /// RFC 3339 (UTC)
    pub created_at: String,
}
