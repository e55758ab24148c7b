//! UseCase: 機能フラグの共有
//!
//! フラグの中身は解釈せず、FeatureStore に通知してからルームへ転送する。

use std::sync::Arc;

use crate::domain::{ClientId, ConnectionRepository, FeatureFlags, FeatureStore, RoomRepository};

use super::{
    error::CollabError,
    membership::{RoomBroadcast, resolve_membership},
};

/// 機能フラグ更新のユースケース
pub struct UpdateFeaturesUseCase {
    rooms: Arc<dyn RoomRepository>,
    connections: Arc<dyn ConnectionRepository>,
    feature_store: Arc<dyn FeatureStore>,
}

impl UpdateFeaturesUseCase {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        connections: Arc<dyn ConnectionRepository>,
        feature_store: Arc<dyn FeatureStore>,
    ) -> Self {
        Self {
            rooms,
            connections,
            feature_store,
        }
    }

    /// FeatureStore への保存に失敗しても転送は行う
    pub async fn execute(
        &self,
        client_id: &ClientId,
        features: &FeatureFlags,
    ) -> Result<RoomBroadcast, CollabError> {
        let membership =
            resolve_membership(self.rooms.as_ref(), self.connections.as_ref(), client_id).await?;

        if let Err(e) = self
            .feature_store
            .save_features(membership.room_id(), features)
            .await
        {
            tracing::warn!(
                "Failed to persist features for room '{}': {}",
                membership.room_id(),
                e
            );
        }

        let targets = membership.others();
        Ok(RoomBroadcast {
            room_id: membership.room.id,
            sender: membership.participant,
            targets,
        })
    }
}
