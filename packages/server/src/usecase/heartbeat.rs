//! UseCase: 接続の生存監視
//!
//! フレームを受信するたびに最終受信時刻を更新し、一定時間フレームが届かない接続を
//! close する。close 後は通常の切断処理（DisconnectParticipantUseCase）が走る。
//! あわせて、作成されたまま誰も参加しなかったルームを一定時間後に削除する。

use std::sync::Arc;

use tsudoi_shared::time::Clock;

use crate::domain::{ClientId, ConnectionRepository, MessagePusher, RoomId, RoomRepository, Timestamp};

/// 生存監視のユースケース
pub struct HeartbeatUseCase {
    rooms: Arc<dyn RoomRepository>,
    connections: Arc<dyn ConnectionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl HeartbeatUseCase {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        connections: Arc<dyn ConnectionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rooms,
            connections,
            message_pusher,
            clock,
        }
    }

    /// 最終受信時刻を現在時刻に更新
    pub async fn record_activity(&self, client_id: &ClientId) {
        let now = Timestamp::new(self.clock.now_millis());
        self.connections.touch(client_id, now).await;
    }

    /// `max_idle_millis` を超えて無通信の接続に close を要求する
    ///
    /// # Returns
    ///
    /// close を要求した接続の ID
    pub async fn evict_stale(&self, max_idle_millis: i64) -> Vec<ClientId> {
        let now = Timestamp::new(self.clock.now_millis());
        let stale = self
            .connections
            .stale_connections(now, max_idle_millis)
            .await;

        for client_id in &stale {
            tracing::info!(
                "Client '{}' missed its keep-alive window, closing connection",
                client_id
            );
            if let Err(e) = self.message_pusher.close(client_id).await {
                tracing::debug!("Close request for '{}' not delivered: {}", client_id, e);
            }
        }

        stale
    }

    /// 作成から `ttl_millis` 以上経っても参加者のいない空のルームを削除する
    ///
    /// # Returns
    ///
    /// 削除したルームの ID
    pub async fn sweep_empty_rooms(&self, ttl_millis: i64) -> Vec<RoomId> {
        let created_before = Timestamp::new(self.clock.now_millis().saturating_sub(ttl_millis));
        self.rooms.delete_empty_rooms(created_before).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConnectionRecord, Outbound, Participant, Room},
        infrastructure::{
            message_pusher::WebSocketMessagePusher,
            repository::{InMemoryConnectionRepository, InMemoryRoomRepository},
        },
    };
    use tokio::sync::mpsc;
    use tsudoi_shared::time::FixedClock;

    fn client_id(id: &str) -> ClientId {
        ClientId::new(id.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_evict_stale_closes_idle_connections_only() {
        // テスト項目: 無通信時間が閾値を超えた接続だけに close が送られる
        // given (前提条件):
        let connections = Arc::new(InMemoryConnectionRepository::new());
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let clock = Arc::new(FixedClock::new(0));
        let usecase = HeartbeatUseCase::new(
            Arc::new(InMemoryRoomRepository::new()),
            connections.clone(),
            pusher.clone(),
            clock.clone(),
        );

        let (idle_tx, mut idle_rx) = mpsc::unbounded_channel();
        let (active_tx, mut active_rx) = mpsc::unbounded_channel();
        for (id, tx) in [("idle", idle_tx), ("active", active_tx)] {
            connections
                .register(ConnectionRecord::new(client_id(id), Timestamp::new(0)))
                .await;
            pusher.register_client(client_id(id), tx).await;
        }

        clock.set(60_000);
        usecase.record_activity(&client_id("active")).await;
        clock.set(100_000);

        // when (操作):
        let evicted = usecase.evict_stale(90_000).await;

        // then (期待する結果):
        assert_eq!(evicted, vec![client_id("idle")]);
        assert_eq!(idle_rx.recv().await, Some(Outbound::Close));
        assert!(active_rx.try_recv().is_err());
    }

    fn room_id(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_sweep_empty_rooms_after_ttl() {
        // テスト項目: 誰も参加しないまま TTL を過ぎたルームだけが削除される
        // given (前提条件):
        let rooms = Arc::new(InMemoryRoomRepository::new());
        let clock = Arc::new(FixedClock::new(0));
        let usecase = HeartbeatUseCase::new(
            rooms.clone(),
            Arc::new(InMemoryConnectionRepository::new()),
            Arc::new(WebSocketMessagePusher::new()),
            clock.clone(),
        );

        rooms
            .create_room(Room::new(room_id("abandoned"), None, Timestamp::new(0)))
            .await
            .unwrap();
        rooms
            .add_participant(
                &room_id("busy"),
                None,
                Participant::new(client_id("c1"), Some("Alice".to_string()), true, Timestamp::new(0)),
                Timestamp::new(0),
            )
            .await
            .unwrap();
        rooms
            .create_room(Room::new(room_id("recent"), None, Timestamp::new(250_000)))
            .await
            .unwrap();
        clock.set(300_000);

        // when (操作):
        let swept = usecase.sweep_empty_rooms(60_000).await;

        // then (期待する結果):
        assert_eq!(swept, vec![room_id("abandoned")]);
        let remaining: Vec<RoomId> = rooms.list_rooms().await.into_iter().map(|r| r.id).collect();
        assert_eq!(remaining, vec![room_id("busy"), room_id("recent")]);
    }
}
