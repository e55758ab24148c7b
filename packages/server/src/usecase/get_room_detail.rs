//! UseCase: ルーム詳細取得

use std::sync::Arc;

use crate::domain::{Room, RoomId, RoomRepository};

use super::error::CollabError;

/// ルーム詳細取得のユースケース
pub struct GetRoomDetailUseCase {
    rooms: Arc<dyn RoomRepository>,
}

impl GetRoomDetailUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>) -> Self {
        Self { rooms }
    }

    /// 存在しない、または不正な ID なら RoomNotFound
    pub async fn execute(&self, room_id: &str) -> Result<Room, CollabError> {
        let id = RoomId::new(room_id.to_string())
            .map_err(|_| CollabError::RoomNotFound(room_id.to_string()))?;
        Ok(self.rooms.get_room(&id).await?)
    }
}
