//! UseCase: ルーム作成処理

use std::sync::Arc;

use tsudoi_shared::time::Clock;

use crate::domain::{Metadata, Room, RoomId, RoomIdFactory, RoomRepository, Timestamp};

use super::error::CollabError;

/// ルーム作成のユースケース
pub struct CreateRoomUseCase {
    rooms: Arc<dyn RoomRepository>,
    clock: Arc<dyn Clock>,
}

impl CreateRoomUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { rooms, clock }
    }

    /// ルームを作成する
    ///
    /// `room_id` が省略された場合は UUID を払い出す。作成直後のルームは参加者 0 人。
    pub async fn execute(
        &self,
        room_id: Option<String>,
        room_name: Option<String>,
        metadata: Option<Metadata>,
    ) -> Result<Room, CollabError> {
        let room_id = match room_id {
            Some(id) => RoomId::new(id).map_err(|e| CollabError::invalid_field("create-room", e))?,
            None => RoomIdFactory::generate().map_err(|e| CollabError::Internal(e.to_string()))?,
        };

        let room = Room::with_metadata(
            room_id,
            room_name,
            metadata.unwrap_or_default(),
            Timestamp::new(self.clock.now_millis()),
        );
        let room = self.rooms.create_room(room).await?;
        tracing::info!("Room '{}' created", room.id);

        Ok(room)
    }
}
