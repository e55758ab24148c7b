//! UseCase: ルーム一覧取得

use std::sync::Arc;

use crate::domain::{Room, RoomRepository};

/// ルーム一覧取得のユースケース
pub struct GetRoomsUseCase {
    rooms: Arc<dyn RoomRepository>,
}

impl GetRoomsUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>) -> Self {
        Self { rooms }
    }

    /// ID 順のスナップショット
    pub async fn execute(&self) -> Vec<Room> {
        self.rooms.list_rooms().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{RoomId, Timestamp},
        infrastructure::repository::InMemoryRoomRepository,
    };

    #[tokio::test]
    async fn test_get_rooms_sorted_by_id() {
        // テスト項目: ルーム一覧が ID 順で返される
        // given (前提条件):
        let rooms = Arc::new(InMemoryRoomRepository::new());
        for id in ["zeta", "alpha"] {
            rooms
                .create_room(Room::new(
                    RoomId::new(id.to_string()).unwrap(),
                    None,
                    Timestamp::new(0),
                ))
                .await
                .unwrap();
        }
        let usecase = GetRoomsUseCase::new(rooms);

        // when (操作):
        let result = usecase.execute().await;

        // then (期待する結果):
        let ids: Vec<&str> = result.iter().map(|room| room.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }
}
