//! MessagePusher trait 定義
//!
//! クライアントへのフレーム送信（unicast / broadcast）の抽象化。
//! 送信はベストエフォート（at-most-once）で、切断済みの接続への送信は破棄される。

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use super::{ClientId, MessagePushError};

/// A frame queued for one connection's writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// JSON text frame
    Text(String),
    /// Ask the writer to send a close frame and stop
    Close,
}

/// Outbound channel of a single connection
pub type PusherChannel = UnboundedSender<Outbound>;

#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続の送信チャンネルを登録
    async fn register_client(&self, client_id: ClientId, sender: PusherChannel);

    /// 接続の送信チャンネルを登録解除
    async fn unregister_client(&self, client_id: &ClientId);

    /// 1 つの接続にフレームを送信
    async fn push_to(&self, client_id: &ClientId, content: &str) -> Result<(), MessagePushError>;

    /// 複数の接続にフレームを送信。個別の送信失敗は許容する
    async fn broadcast(&self, targets: Vec<ClientId>, content: &str)
    -> Result<(), MessagePushError>;

    /// 接続に close を要求
    async fn close(&self, client_id: &ClientId) -> Result<(), MessagePushError>;
}
