//! UseCase: 未知の type のフレームをルームへ転送

use std::sync::Arc;

use crate::domain::{ClientId, ConnectionRepository, RoomRepository};

use super::{
    error::CollabError,
    membership::{RoomBroadcast, resolve_membership},
};

/// 汎用メッセージ転送のユースケース
pub struct ForwardMessageUseCase {
    rooms: Arc<dyn RoomRepository>,
    connections: Arc<dyn ConnectionRepository>,
}

impl ForwardMessageUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>, connections: Arc<dyn ConnectionRepository>) -> Self {
        Self { rooms, connections }
    }

    pub async fn execute(&self, client_id: &ClientId) -> Result<RoomBroadcast, CollabError> {
        let membership =
            resolve_membership(self.rooms.as_ref(), self.connections.as_ref(), client_id).await?;
        let targets = membership.others();
        Ok(RoomBroadcast {
            room_id: membership.room.id,
            sender: membership.participant,
            targets,
        })
    }
}
