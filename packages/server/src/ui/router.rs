//! メッセージルーター
//!
//! 受信したテキストフレームを検証し、対応する UseCase を 1 つだけ実行して、結果を
//! サーバーフレームに変換する。ハンドラ内の panic を含むすべてのエラーは、送信元の
//! 接続に `error` フレームとして返す。

use std::{future::Future, panic::AssertUnwindSafe};

use futures_util::FutureExt;

use crate::{
    domain::ClientId,
    infrastructure::dto::{
        conversion::{error_frame, participant_infos},
        websocket::{ClientMessage, ServerMessage},
    },
    usecase::{CollabError, JoinRequest, LeaveOutcome},
};

use super::{
    state::AppState,
    validation::{InboundFrame, validate_frame},
};

/// `client_id` から受信したテキストフレームを 1 つ処理する
pub async fn handle_frame(state: &AppState, client_id: &ClientId, text: &str) {
    state.heartbeat_usecase.record_activity(client_id).await;

    let frame = match validate_frame(text, state.strict) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!("Rejected frame from '{}': {}", client_id, e);
            reply_error(state, client_id, &e, None).await;
            return;
        }
    };

    let message_type = frame.type_name().to_string();
    tracing::debug!("Dispatching '{}' from '{}'", message_type, client_id);

    if let Err(e) = guarded(dispatch(state, client_id, frame)).await {
        tracing::warn!(
            "Failed to handle '{}' from '{}': {}",
            message_type,
            client_id,
            e
        );
        reply_error(state, client_id, &e, Some(&message_type)).await;
    }
}

/// `handler` 内の panic を `CollabError::Internal` に変換する
pub async fn guarded<F>(handler: F) -> Result<(), CollabError>
where
    F: Future<Output = Result<(), CollabError>>,
{
    match AssertUnwindSafe(handler).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "handler panicked".to_string());
            tracing::error!("Handler panicked: {}", reason);
            Err(CollabError::Internal("unexpected failure while handling message".to_string()))
        }
    }
}

async fn dispatch(
    state: &AppState,
    client_id: &ClientId,
    frame: InboundFrame,
) -> Result<(), CollabError> {
    let message = match frame {
        InboundFrame::Known(message) => message,
        InboundFrame::Unknown {
            message_type,
            payload,
        } => {
            let broadcast = state.forward_message_usecase.execute(client_id).await?;
            let frame = ServerMessage::Message {
                room_id: broadcast.room_id.into_string(),
                sender_id: broadcast.sender.id.into_string(),
                message_type,
                payload,
                timestamp: state.now_millis(),
            };
            broadcast_frame(state, broadcast.targets, &frame).await;
            return Ok(());
        }
    };

    match message {
        ClientMessage::CreateRoom {
            room_id,
            room_name,
            metadata,
        } => {
            let room = state
                .create_room_usecase
                .execute(room_id, room_name, metadata)
                .await?;
            let frame = ServerMessage::RoomCreated {
                room_id: room.id.into_string(),
                room_name: room.name,
                metadata: room.metadata,
                timestamp: state.now_millis(),
            };
            reply(state, client_id, &frame).await;
        }
        ClientMessage::JoinRoom {
            room_id,
            participant_name,
            room_name,
            is_publisher,
        } => {
            let request = JoinRequest {
                room_id,
                participant_name,
                room_name,
                is_publisher: is_publisher.unwrap_or(true),
            };
            let outcome = state.join_room_usecase.execute(client_id, request).await?;

            if let Some(previous) = &outcome.previous {
                notify_participant_left(state, previous).await;
            }

            let timestamp = state.now_millis();
            let joined = ServerMessage::RoomJoined {
                room_id: outcome.room.id.as_str().to_string(),
                room_name: outcome.room.name.clone(),
                participant_id: client_id.as_str().to_string(),
                participants: participant_infos(&outcome.room),
                metadata: outcome.room.metadata.clone(),
                timestamp,
            };
            reply(state, client_id, &joined).await;

            let announcement = ServerMessage::ParticipantJoined {
                room_id: outcome.room.id.as_str().to_string(),
                participant: (&outcome.participant).into(),
                timestamp,
            };
            broadcast_frame(state, outcome.notify_targets(), &announcement).await;
        }
        ClientMessage::LeaveRoom => {
            let outcome = state.leave_room_usecase.execute(client_id).await?;
            let frame = ServerMessage::RoomLeft {
                room_id: outcome.room_id.as_str().to_string(),
                timestamp: state.now_millis(),
            };
            reply(state, client_id, &frame).await;
            notify_participant_left(state, &outcome).await;
        }
        ClientMessage::SendMessage {
            content,
            target_participant_id,
        } => {
            let outcome = state
                .send_message_usecase
                .execute(client_id, content, target_participant_id)
                .await?;
            let frame = ServerMessage::ChatMessage {
                room_id: outcome.broadcast.room_id.into_string(),
                sender_id: outcome.broadcast.sender.id.into_string(),
                sender_name: outcome.broadcast.sender.name,
                content: outcome.content.into_string(),
                target_participant_id: outcome.target.map(ClientId::into_string),
                timestamp: state.now_millis(),
            };
            broadcast_frame(state, outcome.broadcast.targets, &frame).await;
        }
        ClientMessage::CursorUpdate { position, file_id } => {
            let broadcast = state.update_cursor_usecase.execute(client_id).await?;
            let frame = ServerMessage::CursorUpdate {
                room_id: broadcast.room_id.into_string(),
                sender_id: broadcast.sender.id.into_string(),
                position,
                file_id,
                timestamp: state.now_millis(),
            };
            broadcast_frame(state, broadcast.targets, &frame).await;
        }
        ClientMessage::CodeUpdate {
            file_id,
            content,
            metadata,
        } => {
            let broadcast = state
                .update_code_usecase
                .execute(client_id, metadata.clone())
                .await?;
            let frame = ServerMessage::CodeUpdate {
                room_id: broadcast.room_id.into_string(),
                sender_id: broadcast.sender.id.into_string(),
                file_id,
                content,
                metadata,
                timestamp: state.now_millis(),
            };
            broadcast_frame(state, broadcast.targets, &frame).await;
        }
        ClientMessage::UpdateState { state: patch } => {
            let outcome = state.update_state_usecase.execute(client_id, patch).await?;
            let frame = ServerMessage::StateUpdated {
                room_id: outcome.room.id.into_string(),
                sender_id: outcome.sender.id.into_string(),
                state: outcome.room.metadata,
                timestamp: state.now_millis(),
            };
            broadcast_frame(state, outcome.targets, &frame).await;
        }
        ClientMessage::GetRoomParticipants => {
            let room = state.get_participants_usecase.execute(client_id).await?;
            let frame = ServerMessage::RoomParticipants {
                participants: participant_infos(&room),
                room_id: room.id.into_string(),
                timestamp: state.now_millis(),
            };
            reply(state, client_id, &frame).await;
        }
        ClientMessage::Ping => {
            let frame = ServerMessage::Pong {
                timestamp: state.now_millis(),
            };
            reply(state, client_id, &frame).await;
        }
        ClientMessage::FeatureUpdate { features } => {
            let broadcast = state
                .update_features_usecase
                .execute(client_id, &features)
                .await?;
            let frame = ServerMessage::FeatureUpdate {
                room_id: broadcast.room_id.into_string(),
                sender_id: broadcast.sender.id.into_string(),
                features,
                timestamp: state.now_millis(),
            };
            broadcast_frame(state, broadcast.targets, &frame).await;
        }
    }

    Ok(())
}

/// ルームに残っている参加者へ `participant-left` を配信する
pub async fn notify_participant_left(state: &AppState, outcome: &LeaveOutcome) {
    if outcome.room_deleted {
        tracing::info!("Room '{}' is empty and was deleted", outcome.room_id);
        return;
    }
    let frame = ServerMessage::ParticipantLeft {
        room_id: outcome.room_id.as_str().to_string(),
        participant_id: outcome.participant.id.as_str().to_string(),
        participant_name: outcome.participant.name.clone(),
        timestamp: state.now_millis(),
    };
    broadcast_frame(state, outcome.notify_targets.clone(), &frame).await;
}

/// 1 つの接続にフレームを送信する（失敗はログのみ）
pub async fn reply(state: &AppState, client_id: &ClientId, frame: &ServerMessage) {
    let json = match frame.to_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize frame: {}", e);
            return;
        }
    };
    if let Err(e) = state.message_pusher.push_to(client_id, &json).await {
        tracing::debug!("Dropped frame for '{}': {}", client_id, e);
    }
}

async fn broadcast_frame(state: &AppState, targets: Vec<ClientId>, frame: &ServerMessage) {
    if targets.is_empty() {
        return;
    }
    let json = match frame.to_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize frame: {}", e);
            return;
        }
    };
    if let Err(e) = state.message_pusher.broadcast(targets, &json).await {
        tracing::warn!("Broadcast failed: {}", e);
    }
}

async fn reply_error(
    state: &AppState,
    client_id: &ClientId,
    error: &CollabError,
    message_type: Option<&str>,
) {
    let frame = error_frame(error, message_type, state.now_millis());
    reply(state, client_id, &frame).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::{Value, json};
    use tokio::sync::mpsc;
    use tsudoi_shared::time::FixedClock;

    use crate::{
        domain::{Outbound, RoomId, RoomRepository},
        infrastructure::{
            feature_store::InMemoryFeatureStore,
            message_pusher::WebSocketMessagePusher,
            repository::{InMemoryConnectionRepository, InMemoryRoomRepository},
        },
    };

    struct Client {
        id: ClientId,
        rx: mpsc::UnboundedReceiver<Outbound>,
    }

    impl Client {
        /// 受信済みのフレームをすべて取り出す
        fn drain(&mut self) -> Vec<Value> {
            let mut frames = Vec::new();
            while let Ok(outbound) = self.rx.try_recv() {
                if let Outbound::Text(text) = outbound {
                    frames.push(serde_json::from_str(&text).unwrap());
                }
            }
            frames
        }
    }

    fn create_state(strict: bool) -> (Arc<AppState>, Arc<InMemoryRoomRepository>) {
        let rooms = Arc::new(InMemoryRoomRepository::new());
        let state = AppState::new(
            rooms.clone(),
            Arc::new(InMemoryConnectionRepository::new()),
            Arc::new(WebSocketMessagePusher::new()),
            Arc::new(InMemoryFeatureStore::new()),
            Arc::new(FixedClock::new(1000)),
            strict,
        );
        (Arc::new(state), rooms)
    }

    async fn connect(state: &AppState) -> Client {
        let (tx, rx) = mpsc::unbounded_channel();
        let record = state.connect_participant_usecase.execute(tx).await.unwrap();
        Client {
            id: record.client_id,
            rx,
        }
    }

    async fn send(state: &AppState, client: &Client, frame: Value) {
        handle_frame(state, &client.id, &frame.to_string()).await;
    }

    #[tokio::test]
    async fn test_join_replies_and_announces() {
        // テスト項目: join-room で本人に room-joined、既存の参加者に participant-joined が届く
        // given (前提条件):
        let (state, _rooms) = create_state(false);
        let mut alice = connect(&state).await;
        let mut bob = connect(&state).await;
        send(&state, &alice, json!({"type": "join-room", "roomId": "demo", "participantName": "Alice"})).await;
        alice.drain();

        // when (操作):
        send(&state, &bob, json!({"type": "join_room", "roomId": "demo", "participantName": "Bob", "isPublisher": false})).await;

        // then (期待する結果):
        let bob_frames = bob.drain();
        assert_eq!(bob_frames.len(), 1);
        assert_eq!(bob_frames[0]["type"], "room-joined");
        assert_eq!(bob_frames[0]["participants"].as_array().unwrap().len(), 2);
        assert_eq!(bob_frames[0]["participantId"], bob.id.as_str());

        let alice_frames = alice.drain();
        assert_eq!(alice_frames.len(), 1);
        assert_eq!(alice_frames[0]["type"], "participant-joined");
        assert_eq!(alice_frames[0]["participant"]["name"], "Bob");
        assert_eq!(alice_frames[0]["participant"]["isPublisher"], false);
    }

    #[tokio::test]
    async fn test_cursor_update_is_not_echoed() {
        // テスト項目: A の cursor-update は B に届き、A には届かない
        // given (前提条件):
        let (state, _rooms) = create_state(false);
        let mut alice = connect(&state).await;
        let mut bob = connect(&state).await;
        send(&state, &alice, json!({"type": "join-room", "roomId": "demo", "participantName": "Alice"})).await;
        send(&state, &bob, json!({"type": "join-room", "roomId": "demo", "participantName": "Bob", "isPublisher": false})).await;
        alice.drain();
        bob.drain();

        // when (操作):
        send(&state, &alice, json!({"type": "cursor-update", "position": {"line": 3, "column": 7}})).await;

        // then (期待する結果):
        let bob_frames = bob.drain();
        assert_eq!(bob_frames.len(), 1);
        assert_eq!(bob_frames[0]["type"], "cursor-update");
        assert_eq!(bob_frames[0]["senderId"], alice.id.as_str());
        assert_eq!(bob_frames[0]["position"], json!({"line": 3, "column": 7}));
        assert!(alice.drain().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_frame_keeps_membership() {
        // テスト項目: 不正な JSON には error が 1 件だけ返り、ルーム所属は変わらない
        // given (前提条件):
        let (state, rooms) = create_state(false);
        let mut alice = connect(&state).await;
        send(&state, &alice, json!({"type": "join-room", "roomId": "demo"})).await;
        alice.drain();

        // when (操作):
        handle_frame(&state, &alice.id, "{oops").await;

        // then (期待する結果):
        let frames = alice.drain();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "error");
        assert_eq!(frames[0]["code"], "InvalidMessageFormat");
        let room = rooms
            .get_room(&RoomId::new("demo".to_string()).unwrap())
            .await
            .unwrap();
        assert!(room.get_participant(&alice.id).is_some());
    }

    #[tokio::test]
    async fn test_observer_code_update_is_denied_without_broadcast() {
        // テスト項目: publisher でない参加者の code-update は PermissionDenied で、誰にも配信されない
        // given (前提条件):
        let (state, _rooms) = create_state(false);
        let mut alice = connect(&state).await;
        let mut bob = connect(&state).await;
        send(&state, &alice, json!({"type": "join-room", "roomId": "demo"})).await;
        send(&state, &bob, json!({"type": "join-room", "roomId": "demo", "isPublisher": false})).await;
        alice.drain();
        bob.drain();

        // when (操作):
        send(&state, &bob, json!({"type": "code-update", "fileId": "main.rs", "content": "fn main() {}"})).await;

        // then (期待する結果):
        let bob_frames = bob.drain();
        assert_eq!(bob_frames.len(), 1);
        assert_eq!(bob_frames[0]["code"], "PermissionDenied");
        assert_eq!(bob_frames[0]["messageType"], "code-update");
        assert!(alice.drain().is_empty());
    }

    #[tokio::test]
    async fn test_update_state_reaches_sender_too() {
        // テスト項目: state-updated は送信者を含む全員に届き、マージ後の状態を持つ
        // given (前提条件):
        let (state, _rooms) = create_state(false);
        let mut alice = connect(&state).await;
        let mut bob = connect(&state).await;
        send(&state, &alice, json!({"type": "join-room", "roomId": "demo"})).await;
        send(&state, &bob, json!({"type": "join-room", "roomId": "demo"})).await;
        send(&state, &alice, json!({"type": "update-state", "state": {"theme": "dark"}})).await;
        alice.drain();
        bob.drain();

        // when (操作):
        send(&state, &bob, json!({"type": "status_update", "state": {"tab": 2}})).await;

        // then (期待する結果):
        for frames in [alice.drain(), bob.drain()] {
            assert_eq!(frames.len(), 1);
            assert_eq!(frames[0]["type"], "state-updated");
            assert_eq!(frames[0]["state"], json!({"theme": "dark", "tab": 2}));
        }
    }

    #[tokio::test]
    async fn test_leave_room_round_trip() {
        // テスト項目: join 後の leave-room で room-left が返り、ルームが消える
        // given (前提条件):
        let (state, rooms) = create_state(false);
        let mut alice = connect(&state).await;
        send(&state, &alice, json!({"type": "join-room", "roomId": "R1", "participantName": "Alice"})).await;
        let room = rooms
            .get_room(&RoomId::new("R1".to_string()).unwrap())
            .await
            .unwrap();
        assert_eq!(room.participant_count(), 1);
        alice.drain();

        // when (操作):
        send(&state, &alice, json!({"type": "leave-room"})).await;

        // then (期待する結果):
        let frames = alice.drain();
        assert_eq!(frames[0]["type"], "room-left");
        assert!(rooms.list_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn test_leave_without_room_is_not_in_room() {
        // テスト項目: 未所属で leave-room を送ると NotInRoom
        // given (前提条件):
        let (state, _rooms) = create_state(false);
        let mut alice = connect(&state).await;

        // when (操作):
        send(&state, &alice, json!({"type": "leave-room"})).await;

        // then (期待する結果):
        let frames = alice.drain();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["code"], "NotInRoom");
    }

    #[tokio::test]
    async fn test_unknown_type_forwarded_or_rejected() {
        // テスト項目: 未知の type は非 strict では message として転送され、strict では拒否される
        // given (前提条件):
        for strict in [false, true] {
            let (state, _rooms) = create_state(strict);
            let mut alice = connect(&state).await;
            let mut bob = connect(&state).await;
            send(&state, &alice, json!({"type": "join-room", "roomId": "demo"})).await;
            send(&state, &bob, json!({"type": "join-room", "roomId": "demo"})).await;
            alice.drain();
            bob.drain();

            // when (操作):
            send(&state, &alice, json!({"type": "whiteboard-stroke", "points": [1, 2]})).await;

            // then (期待する結果):
            let alice_frames = alice.drain();
            let bob_frames = bob.drain();
            if strict {
                assert_eq!(alice_frames[0]["code"], "InvalidMessageFormat");
                assert!(bob_frames.is_empty());
            } else {
                assert!(alice_frames.is_empty());
                assert_eq!(bob_frames[0]["type"], "message");
                assert_eq!(bob_frames[0]["messageType"], "whiteboard-stroke");
                assert_eq!(bob_frames[0]["payload"]["points"], json!([1, 2]));
            }
        }
    }

    #[tokio::test]
    async fn test_ping_pong_and_create_room() {
        // テスト項目: ping に pong、create-room に room-created が返る
        // given (前提条件):
        let (state, _rooms) = create_state(false);
        let mut alice = connect(&state).await;

        // when (操作):
        send(&state, &alice, json!({"type": "ping"})).await;
        send(&state, &alice, json!({"type": "create_room", "roomId": "new-room", "roomName": "New"})).await;
        send(&state, &alice, json!({"type": "create-room", "roomId": "new-room"})).await;

        // then (期待する結果):
        let frames = alice.drain();
        assert_eq!(frames[0], json!({"type": "pong", "timestamp": 1000}));
        assert_eq!(frames[1]["type"], "room-created");
        assert_eq!(frames[1]["roomName"], "New");
        assert_eq!(frames[2]["code"], "RoomAlreadyExists");
    }

    #[tokio::test]
    async fn test_guarded_converts_panic() {
        // テスト項目: ハンドラ内の panic は InternalError に変換される
        // given (前提条件):
        async fn exploding_handler() -> Result<(), CollabError> {
            panic!("boom")
        }

        // when (操作):
        let result = guarded(exploding_handler()).await;

        // then (期待する結果):
        assert!(matches!(result, Err(CollabError::Internal(_))));
    }
}
