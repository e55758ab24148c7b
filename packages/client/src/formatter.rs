//! Message formatting utilities for client display.

use chrono::{DateTime, Utc};
use tsudoi_server::infrastructure::dto::websocket::{ParticipantInfo, ServerMessage};

use crate::reconnect::ConnectionState;

const RULE: &str = "============================================================";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a server frame for the terminal
    ///
    /// # Arguments
    ///
    /// * `message` - The decoded server frame
    /// * `my_id` - This client's participant id, used to mark "(me)"
    pub fn format_server_message(message: &ServerMessage, my_id: Option<&str>) -> String {
        match message {
            ServerMessage::Connected { client_id, timestamp } => {
                format!("[{}] connected as {}\n", clock(*timestamp), client_id)
            }
            ServerMessage::RoomCreated {
                room_id,
                room_name,
                timestamp,
                ..
            } => format!(
                "[{}] room '{}' ({}) created\n",
                clock(*timestamp),
                room_name,
                room_id
            ),
            ServerMessage::RoomJoined {
                room_id,
                room_name,
                participants,
                ..
            } => Self::format_participants(
                &format!("Joined '{}' ({})", room_name, room_id),
                participants,
                my_id,
            ),
            ServerMessage::ParticipantJoined {
                participant,
                timestamp,
                ..
            } => format!(
                "\n+ {}{} joined at {}\n",
                participant.name,
                role_suffix(participant),
                clock(*timestamp)
            ),
            ServerMessage::RoomLeft { room_id, .. } => format!("\nleft room {}\n", room_id),
            ServerMessage::ParticipantLeft {
                participant_name,
                timestamp,
                ..
            } => format!("\n- {} left at {}\n", participant_name, clock(*timestamp)),
            ServerMessage::ChatMessage {
                sender_name,
                content,
                target_participant_id,
                timestamp,
                ..
            } => {
                let direct = if target_participant_id.is_some() {
                    " (direct)"
                } else {
                    ""
                };
                format!(
                    "\n[{}] @{}{}: {}\n",
                    clock(*timestamp),
                    sender_name,
                    direct,
                    content
                )
            }
            ServerMessage::CursorUpdate {
                sender_id,
                position,
                file_id,
                ..
            } => format!(
                "\n~ {} cursor at {}:{}{}\n",
                short_id(sender_id),
                position.line,
                position.column,
                file_id
                    .as_deref()
                    .map(|file| format!(" in {}", file))
                    .unwrap_or_default()
            ),
            ServerMessage::CodeUpdate {
                sender_id,
                file_id,
                content,
                ..
            } => format!(
                "\n~ {} updated {} ({} bytes)\n",
                short_id(sender_id),
                file_id,
                content.len()
            ),
            ServerMessage::StateUpdated {
                sender_id, state, ..
            } => format!(
                "\n~ {} updated state: {}\n",
                short_id(sender_id),
                serde_json::Value::Object(state.clone())
            ),
            ServerMessage::RoomParticipants {
                room_id,
                participants,
                ..
            } => Self::format_participants(
                &format!("Participants in {}", room_id),
                participants,
                my_id,
            ),
            ServerMessage::Pong { timestamp } => format!("pong at {}\n", clock(*timestamp)),
            ServerMessage::FeatureUpdate {
                sender_id,
                features,
                ..
            } => {
                let flags = features
                    .iter()
                    .map(|(name, enabled)| format!("{}={}", name, enabled))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("\n~ {} toggled features: {}\n", short_id(sender_id), flags)
            }
            ServerMessage::Message {
                sender_id,
                message_type,
                payload,
                ..
            } => format!(
                "\n~ {} sent '{}': {}\n",
                short_id(sender_id),
                message_type,
                payload
            ),
            ServerMessage::Error {
                code,
                message,
                message_type,
                ..
            } => match message_type {
                Some(message_type) => {
                    format!("\n! {:?} ({}): {}\n", code, message_type, message)
                }
                None => format!("\n! {:?}: {}\n", code, message),
            },
        }
    }

    /// Format a participant list under a heading
    pub fn format_participants(
        heading: &str,
        participants: &[ParticipantInfo],
        my_id: Option<&str>,
    ) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{}\n{}:\n", RULE, heading));

        if participants.is_empty() {
            output.push_str("(No participants)\n");
        } else {
            for participant in participants {
                let me_suffix = if Some(participant.id.as_str()) == my_id {
                    " (me)"
                } else {
                    ""
                };
                output.push_str(&format!(
                    "{}{}{}\n",
                    participant.name,
                    role_suffix(participant),
                    me_suffix
                ));
            }
        }

        output.push_str(RULE);
        output.push('\n');
        output
    }

    /// Format a connection state change
    pub fn format_state(state: ConnectionState) -> String {
        let label = match state {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting...",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting...",
            ConnectionState::ErrorDisconnected => "connection lost",
            ConnectionState::Reconnecting => "reconnecting...",
        };
        format!("* {}\n", label)
    }

    /// Format a connection-level error
    pub fn format_connection_error(message: &str, terminal: bool) -> String {
        if terminal {
            format!("!! {}\n", message)
        } else {
            format!("! {}\n", message)
        }
    }
}

/// `HH:MM:SS` (UTC) of a millisecond timestamp
fn clock(timestamp_millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_millis)
        .unwrap_or_default()
        .format("%H:%M:%S")
        .to_string()
}

fn role_suffix(participant: &ParticipantInfo) -> &'static str {
    if participant.is_publisher {
        ""
    } else {
        " [observer]"
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(id: &str, name: &str, is_publisher: bool) -> ParticipantInfo {
        ParticipantInfo {
            id: id.to_string(),
            name: name.to_string(),
            is_publisher,
        }
    }

    #[test]
    fn test_format_room_joined_marks_me_and_observers() {
        // テスト項目: 参加者一覧で自分に (me)、オブザーバーに [observer] が付く
        // given (前提条件):
        let message = ServerMessage::RoomJoined {
            room_id: "demo".to_string(),
            room_name: "Demo".to_string(),
            participant_id: "id-alice".to_string(),
            participants: vec![
                participant("id-alice", "Alice", true),
                participant("id-bob", "Bob", false),
            ],
            metadata: Default::default(),
            timestamp: 1672531200000,
        };

        // when (操作):
        let output = MessageFormatter::format_server_message(&message, Some("id-alice"));

        // then (期待する結果):
        assert!(output.contains("Joined 'Demo' (demo)"));
        assert!(output.contains("Alice (me)\n"));
        assert!(output.contains("Bob [observer]\n"));
    }

    #[test]
    fn test_format_empty_participants() {
        // テスト項目: 参加者がいない場合は (No participants) と表示される
        // given (前提条件):
        let participants: Vec<ParticipantInfo> = vec![];

        // when (操作):
        let output = MessageFormatter::format_participants("Participants in demo", &participants, None);

        // then (期待する結果):
        assert!(output.contains("(No participants)"));
    }

    #[test]
    fn test_format_chat_message_with_time() {
        // テスト項目: チャットメッセージが UTC の時刻と送信者名付きで整形される
        // given (前提条件):
        let message = ServerMessage::ChatMessage {
            room_id: "demo".to_string(),
            sender_id: "id-alice".to_string(),
            sender_name: "Alice".to_string(),
            content: "hi".to_string(),
            target_participant_id: None,
            // 2023-01-01 12:34:56 UTC
            timestamp: 1672576496000,
        };

        // when (操作):
        let output = MessageFormatter::format_server_message(&message, None);

        // then (期待する結果):
        assert_eq!(output, "\n[12:34:56] @Alice: hi\n");
    }

    #[test]
    fn test_format_error_with_message_type() {
        // テスト項目: エラーフレームにはコードと原因のメッセージ種別が表示される
        // given (前提条件):
        let message = ServerMessage::Error {
            code: tsudoi_server::infrastructure::dto::websocket::ErrorCode::PermissionDenied,
            message: "Permission denied: code-update".to_string(),
            message_type: Some("code-update".to_string()),
            timestamp: 0,
        };

        // when (操作):
        let output = MessageFormatter::format_server_message(&message, None);

        // then (期待する結果):
        assert_eq!(
            output,
            "\n! PermissionDenied (code-update): Permission denied: code-update\n"
        );
    }

    #[test]
    fn test_short_id_handles_short_strings() {
        // テスト項目: 8 文字未満の ID はそのまま表示される
        // given (前提条件):
        // when (操作):
        // then (期待する結果):
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id("0123456789"), "01234567");
    }

    #[test]
    fn test_format_state_and_connection_error() {
        // テスト項目: 接続状態と接続エラーの表示
        // given (前提条件):
        // when (操作):
        let state = MessageFormatter::format_state(ConnectionState::Reconnecting);
        let error = MessageFormatter::format_connection_error("Giving up", true);

        // then (期待する結果):
        assert_eq!(state, "* reconnecting...\n");
        assert_eq!(error, "!! Giving up\n");
    }
}
