//! UseCase: 切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//! - 切断時に所属ルームからの退出処理（leave-room と同じ経路）が走ること
//!
//! ### なぜこのテストが必要か
//! - leave-room を送らずに切断しても participant-left が届くことを保証
//! - 切断処理は heartbeat による切断とソケットのクローズで二重に呼ばれうるため冪等であること
//!
//! ### どのような状況を想定しているか
//! - 正常系：ルーム所属中の切断
//! - 正常系：ルーム未所属の切断
//! - エッジケース：同じ接続の 2 回目の切断

use std::sync::Arc;

use crate::domain::{ClientId, ConnectionRepository, MessagePusher, RoomRepository};

use super::membership::{LeaveOutcome, remove_from_room};

/// 切断のユースケース
pub struct DisconnectParticipantUseCase {
    /// Repository（データアクセス層の抽象化）
    rooms: Arc<dyn RoomRepository>,
    /// 接続レジストリ
    connections: Arc<dyn ConnectionRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectParticipantUseCase {
    /// 新しい DisconnectParticipantUseCase を作成
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        connections: Arc<dyn ConnectionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            rooms,
            connections,
            message_pusher,
        }
    }

    /// 切断を実行
    ///
    /// # Returns
    ///
    /// ルームに所属していた場合は退出結果（participant-left の通知先を含む）
    pub async fn execute(&self, client_id: &ClientId) -> Option<LeaveOutcome> {
        // 1. 所属ルームから退出
        let outcome = match self.connections.take_current_room(client_id).await {
            Some(room_id) => match remove_from_room(self.rooms.as_ref(), room_id, client_id).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    tracing::debug!("Nothing to remove for '{}' on disconnect: {}", client_id, e);
                    None
                }
            },
            None => None,
        };

        // 2. 接続レジストリと MessagePusher から削除
        self.connections.unregister(client_id).await;
        self.message_pusher.unregister_client(client_id).await;

        outcome
    }
}
