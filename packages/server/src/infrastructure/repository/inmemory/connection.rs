//! InMemory Connection Repository 実装
//!
//! 接続ごとの現在のルームと最終受信時刻を HashMap で保持します。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ClientId, ConnectionRecord, ConnectionRepository, RepositoryError, RoomId, Timestamp,
};

/// インメモリ Connection Repository 実装
#[derive(Default)]
pub struct InMemoryConnectionRepository {
    connections: Arc<Mutex<HashMap<ClientId, ConnectionRecord>>>,
}

impl InMemoryConnectionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRepository for InMemoryConnectionRepository {
    async fn register(&self, record: ConnectionRecord) {
        let mut connections = self.connections.lock().await;
        connections.insert(record.client_id.clone(), record);
    }

    async fn unregister(&self, client_id: &ClientId) -> Option<ConnectionRecord> {
        let mut connections = self.connections.lock().await;
        connections.remove(client_id)
    }

    async fn get(&self, client_id: &ClientId) -> Option<ConnectionRecord> {
        let connections = self.connections.lock().await;
        connections.get(client_id).cloned()
    }

    async fn set_current_room(
        &self,
        client_id: &ClientId,
        room_id: Option<RoomId>,
    ) -> Result<(), RepositoryError> {
        let mut connections = self.connections.lock().await;
        let record = connections
            .get_mut(client_id)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(client_id.as_str().to_string()))?;
        record.current_room = room_id;
        Ok(())
    }

    async fn take_current_room(&self, client_id: &ClientId) -> Option<RoomId> {
        let mut connections = self.connections.lock().await;
        connections
            .get_mut(client_id)
            .and_then(|record| record.current_room.take())
    }

    async fn touch(&self, client_id: &ClientId, now: Timestamp) {
        let mut connections = self.connections.lock().await;
        if let Some(record) = connections.get_mut(client_id) {
            record.last_seen = record.last_seen.max(now);
        }
    }

    async fn stale_connections(&self, now: Timestamp, max_idle_millis: i64) -> Vec<ClientId> {
        let connections = self.connections.lock().await;
        let mut stale: Vec<ClientId> = connections
            .values()
            .filter(|record| record.last_seen.elapsed_until(now) > max_idle_millis)
            .map(|record| record.client_id.clone())
            .collect();
        stale.sort();
        stale
    }

    async fn count(&self) -> usize {
        let connections = self.connections.lock().await;
        connections.len()
    }
}
