//! UseCase: チャットメッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 配信先の決定（送信者以外の全員、または指定された 1 人）
//!
//! ### なぜこのテストが必要か
//! - 送信者自身にエコーされないことを保証
//! - publisher でない参加者の送信が拒否されることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：ルーム全体へのブロードキャスト、特定の参加者へのユニキャスト
//! - 異常系：ルーム未所属、publisher でない、宛先がルームにいない、空のメッセージ

use std::sync::Arc;

use crate::domain::{ClientId, ConnectionRepository, MessageContent, RoomRepository};

use super::{
    error::CollabError,
    membership::{RoomBroadcast, resolve_membership},
};

/// send-message の結果
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOutcome {
    pub broadcast: RoomBroadcast,
    pub content: MessageContent,
    /// ユニキャストの宛先
    pub target: Option<ClientId>,
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// Repository（データアクセス層の抽象化）
    rooms: Arc<dyn RoomRepository>,
    /// 接続レジストリ
    connections: Arc<dyn ConnectionRepository>,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(rooms: Arc<dyn RoomRepository>, connections: Arc<dyn ConnectionRepository>) -> Self {
        Self { rooms, connections }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `client_id` - 送信元クライアントの ID
    /// * `content` - メッセージ本文
    /// * `target_participant_id` - 指定された場合はその参加者にだけ送る
    ///
    /// # Returns
    ///
    /// * `Ok(ChatOutcome)` - 配信先と本文
    /// * `Err(CollabError)` - 送信不可
    pub async fn execute(
        &self,
        client_id: &ClientId,
        content: String,
        target_participant_id: Option<String>,
    ) -> Result<ChatOutcome, CollabError> {
        let content =
            MessageContent::new(content).map_err(|e| CollabError::invalid_field("send-message", e))?;

        let membership =
            resolve_membership(self.rooms.as_ref(), self.connections.as_ref(), client_id).await?;
        membership.require_publisher("send-message")?;

        let (targets, target) = match target_participant_id {
            Some(raw) => {
                let target = ClientId::new(raw.clone())
                    .ok()
                    .filter(|id| membership.room.get_participant(id).is_some())
                    .ok_or(CollabError::ParticipantNotFound(raw))?;
                (vec![target.clone()], Some(target))
            }
            None => (membership.others(), None),
        };

        Ok(ChatOutcome {
            broadcast: RoomBroadcast {
                room_id: membership.room.id.clone(),
                sender: membership.participant,
                targets,
            },
            content,
            target,
        })
    }
}
