//! テスト用の RoomRepository ラッパー
//!
//! 参加者の追加直後と削除直前に待ち時間を入れ、処理の途中で future が
//! 中断された状態を再現する。

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::domain::{
    ClientId, Metadata, Participant, RemovedParticipant, RepositoryError, Room, RoomId,
    RoomRepository, Timestamp,
};

pub(crate) struct DelayedRoomRepository {
    inner: Arc<dyn RoomRepository>,
    delay: Duration,
}

impl DelayedRoomRepository {
    pub(crate) fn new(inner: Arc<dyn RoomRepository>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl RoomRepository for DelayedRoomRepository {
    async fn create_room(&self, room: Room) -> Result<Room, RepositoryError> {
        self.inner.create_room(room).await
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<Room, RepositoryError> {
        self.inner.get_room(room_id).await
    }

    async fn list_rooms(&self) -> Vec<Room> {
        self.inner.list_rooms().await
    }

    async fn add_participant(
        &self,
        room_id: &RoomId,
        room_name: Option<String>,
        participant: Participant,
        created_at: Timestamp,
    ) -> Result<Room, RepositoryError> {
        let room = self
            .inner
            .add_participant(room_id, room_name, participant, created_at)
            .await;
        tokio::time::sleep(self.delay).await;
        room
    }

    async fn remove_participant(
        &self,
        room_id: &RoomId,
        participant_id: &ClientId,
    ) -> Result<RemovedParticipant, RepositoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.remove_participant(room_id, participant_id).await
    }

    async fn delete_empty_rooms(&self, created_before: Timestamp) -> Vec<RoomId> {
        self.inner.delete_empty_rooms(created_before).await
    }

    async fn merge_metadata(&self, room_id: &RoomId, patch: Metadata) -> Result<Room, RepositoryError> {
        self.inner.merge_metadata(room_id, patch).await
    }
}
