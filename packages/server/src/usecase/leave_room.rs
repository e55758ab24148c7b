//! UseCase: ルーム退出処理

use std::sync::Arc;

use crate::domain::{ClientId, ConnectionRepository, RepositoryError, RoomRepository};

use super::{
    error::CollabError,
    membership::{LeaveOutcome, remove_from_room},
};

/// ルーム退出のユースケース
pub struct LeaveRoomUseCase {
    rooms: Arc<dyn RoomRepository>,
    connections: Arc<dyn ConnectionRepository>,
}

impl LeaveRoomUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>, connections: Arc<dyn ConnectionRepository>) -> Self {
        Self { rooms, connections }
    }

    /// 現在のルームから退出する
    ///
    /// 所属していなければ NotInRoom。最後の参加者だった場合はルームも削除される。
    pub async fn execute(&self, client_id: &ClientId) -> Result<LeaveOutcome, CollabError> {
        let room_id = self
            .connections
            .get(client_id)
            .await
            .and_then(|record| record.current_room)
            .ok_or(CollabError::NotInRoom)?;

        // 参加者を取り除いてから所属を解除する（中断されても切断処理で回収できる）
        let result = remove_from_room(self.rooms.as_ref(), room_id, client_id).await;
        let _ = self.connections.set_current_room(client_id, None).await;

        match result {
            Ok(outcome) => {
                tracing::info!(
                    "Participant '{}' left room '{}'",
                    client_id,
                    outcome.room_id
                );
                Ok(outcome)
            }
            Err(RepositoryError::RoomNotFound(_) | RepositoryError::ParticipantNotFound(_)) => {
                Err(CollabError::NotInRoom)
            }
            Err(e) => Err(e.into()),
        }
    }
}
