//! WebSocket フレームの DTO
//!
//! すべてのフレームは `type` でタグ付けされた JSON オブジェクト。正規の表記は
//! kebab-case で、旧来のアンダースコア表記も受信時のエイリアスとして受け付ける。

use serde::{Deserialize, Serialize};

use crate::domain::{FeatureFlags, Metadata};

/// ファイル内のカーソル位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub line: u32,
    pub column: u32,
}

/// フレーム上の参加者情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub id: String,
    pub name: String,
    pub is_publisher: bool,
}

/// Client → Server フレーム
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    #[serde(alias = "create_room")]
    CreateRoom {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Metadata>,
    },
    #[serde(alias = "join_room")]
    JoinRoom {
        room_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        participant_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_publisher: Option<bool>,
    },
    #[serde(alias = "leave_room")]
    LeaveRoom,
    #[serde(alias = "chat-message", alias = "send_message", alias = "chat_message")]
    SendMessage {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_participant_id: Option<String>,
    },
    #[serde(alias = "cursor_update")]
    CursorUpdate {
        position: CursorPosition,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_id: Option<String>,
    },
    #[serde(alias = "code_update")]
    CodeUpdate {
        file_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Metadata>,
    },
    #[serde(alias = "status_update", alias = "update_state")]
    UpdateState { state: Metadata },
    #[serde(
        alias = "get_participants",
        alias = "get-participants",
        alias = "get_room_participants"
    )]
    GetRoomParticipants,
    Ping,
    #[serde(
        rename = "featureUpdate",
        alias = "feature-update",
        alias = "feature_update"
    )]
    FeatureUpdate { features: FeatureFlags },
}

/// 受け付ける `type` と正規の表記の対応表
///
/// [`ClientMessage`] の serde 名と一致させること
pub const KNOWN_TYPES: &[(&str, &str)] = &[
    ("create-room", "create-room"),
    ("create_room", "create-room"),
    ("join-room", "join-room"),
    ("join_room", "join-room"),
    ("leave-room", "leave-room"),
    ("leave_room", "leave-room"),
    ("send-message", "send-message"),
    ("chat-message", "send-message"),
    ("send_message", "send-message"),
    ("chat_message", "send-message"),
    ("cursor-update", "cursor-update"),
    ("cursor_update", "cursor-update"),
    ("code-update", "code-update"),
    ("code_update", "code-update"),
    ("update-state", "update-state"),
    ("status_update", "update-state"),
    ("update_state", "update-state"),
    ("get-room-participants", "get-room-participants"),
    ("get_participants", "get-room-participants"),
    ("get-participants", "get-room-participants"),
    ("get_room_participants", "get-room-participants"),
    ("ping", "ping"),
    ("featureUpdate", "featureUpdate"),
    ("feature-update", "featureUpdate"),
    ("feature_update", "featureUpdate"),
];

/// 既知の `type` の正規表記（未知の場合は `None`）
pub fn canonical_type(raw: &str) -> Option<&'static str> {
    KNOWN_TYPES
        .iter()
        .find(|(alias, _)| *alias == raw)
        .map(|(_, canonical)| *canonical)
}

impl ClientMessage {
    /// このフレームの正規の `type`
    pub fn type_name(&self) -> &'static str {
        match self {
            ClientMessage::CreateRoom { .. } => "create-room",
            ClientMessage::JoinRoom { .. } => "join-room",
            ClientMessage::LeaveRoom => "leave-room",
            ClientMessage::SendMessage { .. } => "send-message",
            ClientMessage::CursorUpdate { .. } => "cursor-update",
            ClientMessage::CodeUpdate { .. } => "code-update",
            ClientMessage::UpdateState { .. } => "update-state",
            ClientMessage::GetRoomParticipants => "get-room-participants",
            ClientMessage::Ping => "ping",
            ClientMessage::FeatureUpdate { .. } => "featureUpdate",
        }
    }
}

/// `error` フレームのエラーコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    InvalidMessageFormat,
    SchemaValidationFailed,
    RoomNotFound,
    RoomAlreadyExists,
    PermissionDenied,
    NotInRoom,
    ParticipantNotFound,
    InternalError,
}

/// Server → Client フレーム
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Connected {
        client_id: String,
        timestamp: i64,
    },
    RoomCreated {
        room_id: String,
        room_name: String,
        metadata: Metadata,
        timestamp: i64,
    },
    RoomJoined {
        room_id: String,
        room_name: String,
        participant_id: String,
        participants: Vec<ParticipantInfo>,
        metadata: Metadata,
        timestamp: i64,
    },
    ParticipantJoined {
        room_id: String,
        participant: ParticipantInfo,
        timestamp: i64,
    },
    RoomLeft {
        room_id: String,
        timestamp: i64,
    },
    ParticipantLeft {
        room_id: String,
        participant_id: String,
        participant_name: String,
        timestamp: i64,
    },
    ChatMessage {
        room_id: String,
        sender_id: String,
        sender_name: String,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_participant_id: Option<String>,
        timestamp: i64,
    },
    CursorUpdate {
        room_id: String,
        sender_id: String,
        position: CursorPosition,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_id: Option<String>,
        timestamp: i64,
    },
    CodeUpdate {
        room_id: String,
        sender_id: String,
        file_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Metadata>,
        timestamp: i64,
    },
    StateUpdated {
        room_id: String,
        sender_id: String,
        state: Metadata,
        timestamp: i64,
    },
    RoomParticipants {
        room_id: String,
        participants: Vec<ParticipantInfo>,
        timestamp: i64,
    },
    Pong {
        timestamp: i64,
    },
    #[serde(rename = "featureUpdate")]
    FeatureUpdate {
        room_id: String,
        sender_id: String,
        features: FeatureFlags,
        timestamp: i64,
    },
    /// 未知の type のフレームをそのまま転送したもの
    Message {
        room_id: String,
        sender_id: String,
        message_type: String,
        payload: serde_json::Value,
        timestamp: i64,
    },
    Error {
        code: ErrorCode,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_type: Option<String>,
        timestamp: i64,
    },
}

impl ServerMessage {
    /// JSON テキストフレームにシリアライズ
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
