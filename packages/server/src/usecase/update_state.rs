//! UseCase: ルーム状態の更新

use std::sync::Arc;

use crate::domain::{ClientId, ConnectionRepository, Metadata, Participant, Room, RoomRepository};

use super::{error::CollabError, membership::resolve_membership};

/// update-state の結果
#[derive(Debug, Clone, PartialEq)]
pub struct StateOutcome {
    /// マージ後のルーム
    pub room: Room,
    pub sender: Participant,
    /// 送信者を含む全参加者
    pub targets: Vec<ClientId>,
}

/// ルーム状態更新のユースケース
pub struct UpdateStateUseCase {
    rooms: Arc<dyn RoomRepository>,
    connections: Arc<dyn ConnectionRepository>,
}

impl UpdateStateUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>, connections: Arc<dyn ConnectionRepository>) -> Self {
        Self { rooms, connections }
    }

    /// publisher のみ。トップレベルのキー単位で後勝ちマージする。
    pub async fn execute(
        &self,
        client_id: &ClientId,
        state: Metadata,
    ) -> Result<StateOutcome, CollabError> {
        let membership =
            resolve_membership(self.rooms.as_ref(), self.connections.as_ref(), client_id).await?;
        membership.require_publisher("update-state")?;

        let room = self.rooms.merge_metadata(membership.room_id(), state).await?;

        Ok(StateOutcome {
            targets: room.broadcast_targets(None),
            room,
            sender: membership.participant,
        })
    }
}
