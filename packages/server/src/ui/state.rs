//! Shared application state.

use std::sync::Arc;

use tsudoi_shared::time::Clock;

use crate::{
    domain::{ConnectionRepository, FeatureStore, MessagePusher, RoomRepository},
    usecase::{
        ConnectParticipantUseCase, CreateRoomUseCase, DisconnectParticipantUseCase,
        ForwardMessageUseCase, GetParticipantsUseCase, GetRoomDetailUseCase, GetRoomsUseCase,
        HeartbeatUseCase, JoinRoomUseCase, LeaveRoomUseCase, SendMessageUseCase,
        UpdateCodeUseCase, UpdateCursorUseCase, UpdateFeaturesUseCase, UpdateStateUseCase,
    },
};

/// Shared application state
pub struct AppState {
    /// ConnectParticipantUseCase（接続のユースケース）
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// DisconnectParticipantUseCase（切断のユースケース）
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    pub create_room_usecase: Arc<CreateRoomUseCase>,
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    pub leave_room_usecase: Arc<LeaveRoomUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    pub update_cursor_usecase: Arc<UpdateCursorUseCase>,
    pub update_code_usecase: Arc<UpdateCodeUseCase>,
    pub update_state_usecase: Arc<UpdateStateUseCase>,
    pub update_features_usecase: Arc<UpdateFeaturesUseCase>,
    pub get_participants_usecase: Arc<GetParticipantsUseCase>,
    pub forward_message_usecase: Arc<ForwardMessageUseCase>,
    /// GetRoomsUseCase（ルーム一覧取得のユースケース）
    pub get_rooms_usecase: Arc<GetRoomsUseCase>,
    /// GetRoomDetailUseCase（ルーム詳細取得のユースケース）
    pub get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
    pub heartbeat_usecase: Arc<HeartbeatUseCase>,
    /// MessagePusher（メッセージ通知の抽象化）
    pub message_pusher: Arc<dyn MessagePusher>,
    pub clock: Arc<dyn Clock>,
    /// 未知の type を拒否する
    pub strict: bool,
}

impl AppState {
    /// Wire every use case on top of the given repositories and adapters
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        connections: Arc<dyn ConnectionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        feature_store: Arc<dyn FeatureStore>,
        clock: Arc<dyn Clock>,
        strict: bool,
    ) -> Self {
        Self {
            connect_participant_usecase: Arc::new(ConnectParticipantUseCase::new(
                connections.clone(),
                message_pusher.clone(),
                clock.clone(),
            )),
            disconnect_participant_usecase: Arc::new(DisconnectParticipantUseCase::new(
                rooms.clone(),
                connections.clone(),
                message_pusher.clone(),
            )),
            create_room_usecase: Arc::new(CreateRoomUseCase::new(rooms.clone(), clock.clone())),
            join_room_usecase: Arc::new(JoinRoomUseCase::new(
                rooms.clone(),
                connections.clone(),
                clock.clone(),
            )),
            leave_room_usecase: Arc::new(LeaveRoomUseCase::new(
                rooms.clone(),
                connections.clone(),
            )),
            send_message_usecase: Arc::new(SendMessageUseCase::new(
                rooms.clone(),
                connections.clone(),
            )),
            update_cursor_usecase: Arc::new(UpdateCursorUseCase::new(
                rooms.clone(),
                connections.clone(),
            )),
            update_code_usecase: Arc::new(UpdateCodeUseCase::new(
                rooms.clone(),
                connections.clone(),
            )),
            update_state_usecase: Arc::new(UpdateStateUseCase::new(
                rooms.clone(),
                connections.clone(),
            )),
            update_features_usecase: Arc::new(UpdateFeaturesUseCase::new(
                rooms.clone(),
                connections.clone(),
                feature_store,
            )),
            get_participants_usecase: Arc::new(GetParticipantsUseCase::new(
                rooms.clone(),
                connections.clone(),
            )),
            forward_message_usecase: Arc::new(ForwardMessageUseCase::new(
                rooms.clone(),
                connections.clone(),
            )),
            get_rooms_usecase: Arc::new(GetRoomsUseCase::new(rooms.clone())),
            get_room_detail_usecase: Arc::new(GetRoomDetailUseCase::new(rooms.clone())),
            heartbeat_usecase: Arc::new(HeartbeatUseCase::new(
                rooms,
                connections,
                message_pusher.clone(),
                clock.clone(),
            )),
            message_pusher,
            clock,
            strict,
        }
    }

    /// Current time in epoch milliseconds
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }
}
