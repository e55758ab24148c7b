//! UseCase: ルーム参加処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//! - 存在しないルームへの参加でルームが作られること
//! - 別のルームに所属中の参加では元のルームから先に退出すること
//!
//! ### どのような状況を想定しているか
//! - 正常系：空のディレクトリへの参加、既存ルームへの参加
//! - 正常系：ルームの移動、同じルームへの再参加
//! - 異常系：不正なルーム ID
//! - 異常系：参加処理の途中で中断された場合（切断処理でルームが残らないこと）

use std::sync::Arc;

use tsudoi_shared::time::Clock;

use crate::domain::{
    ClientId, ConnectionRepository, Participant, Room, RoomId, RoomRepository, Timestamp,
};

use super::{
    error::CollabError,
    membership::{LeaveOutcome, remove_from_room},
};

/// join-room の入力
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub room_id: String,
    pub participant_name: Option<String>,
    pub room_name: Option<String>,
    pub is_publisher: bool,
}

/// join-room の結果
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    /// 参加後のルームのスナップショット
    pub room: Room,
    /// 参加した本人
    pub participant: Participant,
    /// 移動前のルームからの退出結果
    pub previous: Option<LeaveOutcome>,
}

impl JoinOutcome {
    /// participant-joined の通知先（本人以外）
    pub fn notify_targets(&self) -> Vec<ClientId> {
        self.room.broadcast_targets(Some(&self.participant.id))
    }
}

/// ルーム参加のユースケース
pub struct JoinRoomUseCase {
    rooms: Arc<dyn RoomRepository>,
    connections: Arc<dyn ConnectionRepository>,
    clock: Arc<dyn Clock>,
}

impl JoinRoomUseCase {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        connections: Arc<dyn ConnectionRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rooms,
            connections,
            clock,
        }
    }

    /// ルームに参加する（ルームがなければ作成する）
    pub async fn execute(
        &self,
        client_id: &ClientId,
        request: JoinRequest,
    ) -> Result<JoinOutcome, CollabError> {
        let room_id =
            RoomId::new(request.room_id).map_err(|e| CollabError::invalid_field("join-room", e))?;

        // 1. 別のルームに所属していれば先に退出
        let current = self
            .connections
            .get(client_id)
            .await
            .and_then(|record| record.current_room);
        let previous = match current {
            Some(current) if current != room_id => {
                remove_from_room(self.rooms.as_ref(), current, client_id)
                    .await
                    .ok()
            }
            _ => None,
        };

        // 2. 参加者を追加する前に所属ルームを記録する
        //    途中で中断されても切断処理がこのルームから参加者を取り除ける
        self.connections
            .set_current_room(client_id, Some(room_id.clone()))
            .await?;

        // 3. 参加者を追加（ルームがなければ作成）
        let now = Timestamp::new(self.clock.now_millis());
        let participant = Participant::new(
            client_id.clone(),
            request.participant_name,
            request.is_publisher,
            now,
        );
        let room = match self
            .rooms
            .add_participant(&room_id, request.room_name, participant.clone(), now)
            .await
        {
            Ok(room) => room,
            Err(e) => {
                let _ = self.connections.set_current_room(client_id, None).await;
                return Err(e.into());
            }
        };

        tracing::info!(
            "Participant '{}' ({}) joined room '{}'",
            participant.name,
            client_id,
            room_id
        );

        Ok(JoinOutcome {
            room,
            participant,
            previous,
        })
    }
}
