//! UseCase: 所属ルームの参加者一覧取得

use std::sync::Arc;

use crate::domain::{ClientId, ConnectionRepository, Room, RoomRepository};

use super::{error::CollabError, membership::resolve_membership};

/// 参加者一覧取得のユースケース
pub struct GetParticipantsUseCase {
    rooms: Arc<dyn RoomRepository>,
    connections: Arc<dyn ConnectionRepository>,
}

impl GetParticipantsUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>, connections: Arc<dyn ConnectionRepository>) -> Self {
        Self { rooms, connections }
    }

    /// 所属ルームのスナップショットを返す
    pub async fn execute(&self, client_id: &ClientId) -> Result<Room, CollabError> {
        let membership =
            resolve_membership(self.rooms.as_ref(), self.connections.as_ref(), client_id).await?;
        Ok(membership.room)
    }
}
