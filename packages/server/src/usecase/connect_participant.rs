//! UseCase: 接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - 新しい接続に一意な ClientId が払い出され、接続レジストリと MessagePusher に登録されること
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規接続
//! - 複数接続：接続ごとに異なる ClientId が払い出される

use std::sync::Arc;

use tsudoi_shared::time::Clock;

use crate::domain::{
    ClientIdFactory, ConnectionRecord, ConnectionRepository, MessagePusher, PusherChannel,
    Timestamp,
};

use super::error::CollabError;

/// 接続のユースケース
pub struct ConnectParticipantUseCase {
    /// 接続レジストリ
    connections: Arc<dyn ConnectionRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ConnectParticipantUseCase {
    /// 新しい ConnectParticipantUseCase を作成
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            connections,
            message_pusher,
            clock,
        }
    }

    /// 接続を実行
    ///
    /// # Arguments
    ///
    /// * `sender` - クライアントへのフレーム送信用チャンネル
    ///
    /// # Returns
    ///
    /// 払い出した ClientId を含む接続レコード
    pub async fn execute(&self, sender: PusherChannel) -> Result<ConnectionRecord, CollabError> {
        // 1. ClientId を払い出す
        let client_id =
            ClientIdFactory::generate().map_err(|e| CollabError::Internal(e.to_string()))?;

        // 2. 接続レジストリに登録
        let record = ConnectionRecord::new(client_id.clone(), Timestamp::new(self.clock.now_millis()));
        self.connections.register(record.clone()).await;

        // 3. MessagePusher にクライアントを登録
        self.message_pusher.register_client(client_id, sender).await;

        Ok(record)
    }
}
