//! UseCase: コード更新の共有

use std::sync::Arc;

use crate::domain::{ClientId, ConnectionRepository, Metadata, RoomRepository};

use super::{
    error::CollabError,
    membership::{RoomBroadcast, resolve_membership},
};

/// コード更新のユースケース
pub struct UpdateCodeUseCase {
    rooms: Arc<dyn RoomRepository>,
    connections: Arc<dyn ConnectionRepository>,
}

impl UpdateCodeUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>, connections: Arc<dyn ConnectionRepository>) -> Self {
        Self { rooms, connections }
    }

    /// publisher のみ。`metadata` があればルームのメタデータにマージしてから配信先を決める。
    pub async fn execute(
        &self,
        client_id: &ClientId,
        metadata: Option<Metadata>,
    ) -> Result<RoomBroadcast, CollabError> {
        let membership =
            resolve_membership(self.rooms.as_ref(), self.connections.as_ref(), client_id).await?;
        membership.require_publisher("code-update")?;

        let room = match metadata {
            Some(patch) if !patch.is_empty() => {
                self.rooms.merge_metadata(membership.room_id(), patch).await?
            }
            _ => membership.room,
        };

        Ok(RoomBroadcast {
            targets: room.broadcast_targets(Some(client_id)),
            room_id: room.id,
            sender: membership.participant,
        })
    }
}
