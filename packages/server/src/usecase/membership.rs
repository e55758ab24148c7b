//! ルーム所属の解決と退出処理（複数の UseCase で共有）

use crate::domain::{
    ClientId, ConnectionRepository, Participant, RepositoryError, Room, RoomId, RoomRepository,
};

use super::error::CollabError;

/// 接続が現在所属しているルームと、そのルーム内での参加者
#[derive(Debug, Clone, PartialEq)]
pub struct Membership {
    /// ルームのスナップショット
    pub room: Room,
    /// 送信者自身
    pub participant: Participant,
}

impl Membership {
    pub fn room_id(&self) -> &RoomId {
        &self.room.id
    }

    /// 送信者を除く配信先
    pub fn others(&self) -> Vec<ClientId> {
        self.room.broadcast_targets(Some(&self.participant.id))
    }

    /// 送信者を含む全配信先
    pub fn everyone(&self) -> Vec<ClientId> {
        self.room.broadcast_targets(None)
    }

    /// publisher 権限がなければ PermissionDenied
    pub fn require_publisher(&self, action: &str) -> Result<(), CollabError> {
        if self.participant.is_publisher {
            Ok(())
        } else {
            Err(CollabError::PermissionDenied(action.to_string()))
        }
    }
}

/// ルーム内の配信 1 件分（送信者と配信先）
#[derive(Debug, Clone, PartialEq)]
pub struct RoomBroadcast {
    pub room_id: RoomId,
    pub sender: Participant,
    pub targets: Vec<ClientId>,
}

/// 退出処理の結果
#[derive(Debug, Clone, PartialEq)]
pub struct LeaveOutcome {
    pub room_id: RoomId,
    /// 退出した参加者
    pub participant: Participant,
    /// participant-left の通知先（残りの参加者）
    pub notify_targets: Vec<ClientId>,
    /// 最後の参加者だったためルームが削除されたか
    pub room_deleted: bool,
}

/// 接続の所属ルームを解決する
///
/// 所属していない、またはルームや参加者が既に存在しない場合は NotInRoom。
pub async fn resolve_membership(
    rooms: &dyn RoomRepository,
    connections: &dyn ConnectionRepository,
    client_id: &ClientId,
) -> Result<Membership, CollabError> {
    let room_id = connections
        .get(client_id)
        .await
        .and_then(|record| record.current_room)
        .ok_or(CollabError::NotInRoom)?;

    let room = match rooms.get_room(&room_id).await {
        Ok(room) => room,
        Err(RepositoryError::RoomNotFound(_)) => return Err(CollabError::NotInRoom),
        Err(e) => return Err(e.into()),
    };

    let participant = room
        .get_participant(client_id)
        .cloned()
        .ok_or(CollabError::NotInRoom)?;

    Ok(Membership { room, participant })
}

/// ルームから参加者を取り除く（空になればルームも削除される）
pub async fn remove_from_room(
    rooms: &dyn RoomRepository,
    room_id: RoomId,
    client_id: &ClientId,
) -> Result<LeaveOutcome, RepositoryError> {
    let removed = rooms.remove_participant(&room_id, client_id).await?;
    Ok(LeaveOutcome {
        room_id,
        participant: removed.participant,
        notify_targets: removed.remaining,
        room_deleted: removed.room_deleted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConnectionRecord, Timestamp},
        infrastructure::repository::{InMemoryConnectionRepository, InMemoryRoomRepository},
    };

    fn client_id(id: &str) -> ClientId {
        ClientId::new(id.to_string()).unwrap()
    }

    fn room_id(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_membership_not_in_room() {
        // テスト項目: ルームに所属していない接続は NotInRoom になる
        // given (前提条件):
        let rooms = InMemoryRoomRepository::new();
        let connections = InMemoryConnectionRepository::new();
        connections
            .register(ConnectionRecord::new(client_id("alice"), Timestamp::new(0)))
            .await;

        // when (操作):
        let result = resolve_membership(&rooms, &connections, &client_id("alice")).await;

        // then (期待する結果):
        assert_eq!(result, Err(CollabError::NotInRoom));
    }

    #[tokio::test]
    async fn test_resolve_membership_success() {
        // テスト項目: 所属ルームと参加者が解決され、others は自分を含まない
        // given (前提条件):
        let rooms = InMemoryRoomRepository::new();
        let connections = InMemoryConnectionRepository::new();
        for (id, at) in [("alice", 1), ("bob", 2)] {
            connections
                .register(ConnectionRecord::new(client_id(id), Timestamp::new(0)))
                .await;
            rooms
                .add_participant(
                    &room_id("demo"),
                    None,
                    Participant::new(client_id(id), None, true, Timestamp::new(at)),
                    Timestamp::new(0),
                )
                .await
                .unwrap();
            connections
                .set_current_room(&client_id(id), Some(room_id("demo")))
                .await
                .unwrap();
        }

        // when (操作):
        let membership = resolve_membership(&rooms, &connections, &client_id("alice"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(membership.room_id(), &room_id("demo"));
        assert_eq!(membership.others(), vec![client_id("bob")]);
        assert_eq!(membership.everyone(), vec![client_id("alice"), client_id("bob")]);
    }

    #[tokio::test]
    async fn test_require_publisher() {
        // テスト項目: publisher でない参加者は PermissionDenied になる
        // given (前提条件):
        let membership = Membership {
            room: Room::new(room_id("demo"), None, Timestamp::new(0)),
            participant: Participant::new(client_id("bob"), None, false, Timestamp::new(0)),
        };

        // when (操作):
        let result = membership.require_publisher("code-update");

        // then (期待する結果):
        assert_eq!(
            result,
            Err(CollabError::PermissionDenied("code-update".to_string()))
        );
    }
}
