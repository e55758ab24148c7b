//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! - `RoomRepository`: ルームディレクトリ（room id -> Room）
//! - `ConnectionRepository`: 接続レジストリ（接続 -> 現在のルーム、最終受信時刻）

use async_trait::async_trait;

use super::{ClientId, Metadata, Participant, RepositoryError, Room, RoomId, Timestamp};

/// ルームから参加者を削除した結果
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedParticipant {
    /// 削除された参加者
    pub participant: Participant,
    /// 削除後もルームに残っている参加者（スナップショット、id 順）
    pub remaining: Vec<ClientId>,
    /// 空になったためルームも削除されたか
    pub room_deleted: bool,
}

/// Room Directory trait
///
/// ルームの作成・検索・空になったルームの削除を担う。
/// 各メソッドは read-modify-write 全体を 1 つのクリティカルセクションで実行すること。
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// ルームを作成。同じ id のルームが存在する場合は `RoomAlreadyExists`
    async fn create_room(&self, room: Room) -> Result<Room, RepositoryError>;

    /// ルームのスナップショットを取得
    async fn get_room(&self, room_id: &RoomId) -> Result<Room, RepositoryError>;

    /// 全ルームのスナップショットを取得（room id 順）
    async fn list_rooms(&self) -> Vec<Room>;

    /// 参加者をルームに追加。ルームが存在しなければ `room_name` で作成する
    async fn add_participant(
        &self,
        room_id: &RoomId,
        room_name: Option<String>,
        participant: Participant,
        created_at: Timestamp,
    ) -> Result<Room, RepositoryError>;

    /// 参加者をルームから削除し、空になったルームを同時に削除する
    async fn remove_participant(
        &self,
        room_id: &RoomId,
        participant_id: &ClientId,
    ) -> Result<RemovedParticipant, RepositoryError>;

    /// `created_before` より前に作られ、参加者のいないルームを削除する
    ///
    /// 削除したルームの id を返す（room id 順）
    async fn delete_empty_rooms(&self, created_before: Timestamp) -> Vec<RoomId>;

    /// メタデータをマージし、更新後のルームを返す
    async fn merge_metadata(&self, room_id: &RoomId, patch: Metadata)
    -> Result<Room, RepositoryError>;
}

/// 接続レジストリの 1 エントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub client_id: ClientId,
    pub connected_at: Timestamp,
    /// 最後にフレームを受信した時刻
    pub last_seen: Timestamp,
    /// 現在参加しているルーム
    pub current_room: Option<RoomId>,
}

impl ConnectionRecord {
    pub fn new(client_id: ClientId, connected_at: Timestamp) -> Self {
        Self {
            client_id,
            connected_at,
            last_seen: connected_at,
            current_room: None,
        }
    }
}

/// Connection Registry trait
///
/// 接続ごとに 1 エントリを保持し、現在のルームと最終受信時刻を管理する。
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// 接続を登録
    async fn register(&self, record: ConnectionRecord);

    /// 接続を登録解除し、登録されていたエントリを返す
    async fn unregister(&self, client_id: &ClientId) -> Option<ConnectionRecord>;

    /// 接続エントリを取得
    async fn get(&self, client_id: &ClientId) -> Option<ConnectionRecord>;

    /// 現在のルームを設定（None で退出）
    async fn set_current_room(
        &self,
        client_id: &ClientId,
        room_id: Option<RoomId>,
    ) -> Result<(), RepositoryError>;

    /// 現在のルームを取り出してクリアする
    async fn take_current_room(&self, client_id: &ClientId) -> Option<RoomId>;

    /// 最終受信時刻を更新
    async fn touch(&self, client_id: &ClientId, now: Timestamp);

    /// `now - last_seen > max_idle_millis` の接続 id を返す
    async fn stale_connections(&self, now: Timestamp, max_idle_millis: i64) -> Vec<ClientId>;

    /// 接続数
    async fn count(&self) -> usize;
}
