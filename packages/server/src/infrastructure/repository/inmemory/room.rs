//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//!
//! ルームディレクトリ全体を 1 つの Mutex で保護し、join / leave / メタデータ更新の
//! read-modify-write をロックを保持したまま完了させます。
//! 最後の参加者の削除とルームの削除も同じクリティカルセクション内で行うため、
//! 参加者 0 人のルームが外部から観測されることはありません。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ClientId, Metadata, Participant, RemovedParticipant, RepositoryError, Room, RoomId,
    RoomRepository, Timestamp,
};

/// インメモリ Room Repository 実装
#[derive(Default)]
pub struct InMemoryRoomRepository {
    /// room id -> Room
    rooms: Arc<Mutex<HashMap<RoomId, Room>>>,
}

impl InMemoryRoomRepository {
    /// 新しい空の InMemoryRoomRepository を作成
    pub fn new() -> Self {
        Self::default()
    }
}

fn room_not_found(room_id: &RoomId) -> RepositoryError {
    RepositoryError::RoomNotFound(room_id.as_str().to_string())
}

/// 参加者 0 人ならルームを削除する（呼び出し側がロックを保持していること）
fn delete_if_empty(rooms: &mut HashMap<RoomId, Room>, room_id: &RoomId) -> bool {
    if rooms.get(room_id).is_some_and(Room::is_empty) {
        rooms.remove(room_id);
        tracing::info!("Room '{}' is empty and was deleted", room_id);
        return true;
    }
    false
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn create_room(&self, room: Room) -> Result<Room, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        if rooms.contains_key(&room.id) {
            return Err(RepositoryError::RoomAlreadyExists(
                room.id.as_str().to_string(),
            ));
        }
        rooms.insert(room.id.clone(), room.clone());
        Ok(room)
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<Room, RepositoryError> {
        let rooms = self.rooms.lock().await;
        rooms.get(room_id).cloned().ok_or_else(|| room_not_found(room_id))
    }

    async fn list_rooms(&self) -> Vec<Room> {
        let rooms = self.rooms.lock().await;
        let mut snapshot: Vec<Room> = rooms.values().cloned().collect();
        snapshot.sort_by(|a, b| a.id.cmp(&b.id));
        snapshot
    }

    async fn add_participant(
        &self,
        room_id: &RoomId,
        room_name: Option<String>,
        participant: Participant,
        created_at: Timestamp,
    ) -> Result<Room, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms.entry(room_id.clone()).or_insert_with(|| {
            tracing::info!("Room '{}' created on first join", room_id);
            Room::new(room_id.clone(), room_name, created_at)
        });
        room.add_participant(participant);
        Ok(room.clone())
    }

    async fn remove_participant(
        &self,
        room_id: &RoomId,
        participant_id: &ClientId,
    ) -> Result<RemovedParticipant, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms.get_mut(room_id).ok_or_else(|| room_not_found(room_id))?;
        let participant = room.remove_participant(participant_id).ok_or_else(|| {
            RepositoryError::ParticipantNotFound(participant_id.as_str().to_string())
        })?;
        let remaining = room.broadcast_targets(None);
        let room_deleted = delete_if_empty(&mut rooms, room_id);

        Ok(RemovedParticipant {
            participant,
            remaining,
            room_deleted,
        })
    }

    async fn delete_empty_rooms(&self, created_before: Timestamp) -> Vec<RoomId> {
        let mut rooms = self.rooms.lock().await;
        let mut expired: Vec<RoomId> = rooms
            .values()
            .filter(|room| room.is_empty() && room.created_at < created_before)
            .map(|room| room.id.clone())
            .collect();
        expired.sort();

        for room_id in &expired {
            rooms.remove(room_id);
            tracing::info!("Room '{}' was never joined and expired", room_id);
        }
        expired
    }

    async fn merge_metadata(
        &self,
        room_id: &RoomId,
        patch: Metadata,
    ) -> Result<Room, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms.get_mut(room_id).ok_or_else(|| room_not_found(room_id))?;
        room.merge_metadata(patch);
        Ok(room.clone())
    }
}
