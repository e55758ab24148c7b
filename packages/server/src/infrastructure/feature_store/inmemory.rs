//! In-process stand-in for the external feature store.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{FeatureFlags, FeatureStore, FeatureStoreError, RoomId};

/// Keeps the latest flags per room in memory.
#[derive(Default)]
pub struct InMemoryFeatureStore {
    features: Arc<Mutex<HashMap<RoomId, FeatureFlags>>>,
}

impl InMemoryFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags stored for a room (empty if none)
    pub async fn features_for(&self, room_id: &RoomId) -> FeatureFlags {
        let features = self.features.lock().await;
        features.get(room_id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl FeatureStore for InMemoryFeatureStore {
    async fn save_features(
        &self,
        room_id: &RoomId,
        features: &FeatureFlags,
    ) -> Result<(), FeatureStoreError> {
        let mut stored = self.features.lock().await;
        let entry = stored.entry(room_id.clone()).or_default();
        entry.extend(features.iter().map(|(name, enabled)| (name.clone(), *enabled)));
        tracing::debug!("Stored {} feature flag(s) for room '{}'", features.len(), room_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_features_merges_flags() {
        // テスト項目: 保存したフラグがルームごとにマージされる
        // given (前提条件):
        let store = InMemoryFeatureStore::new();
        let room_id = RoomId::new("demo".to_string()).unwrap();
        let first = FeatureFlags::from([("voice".to_string(), true), ("ai".to_string(), false)]);
        let second = FeatureFlags::from([("ai".to_string(), true)]);

        // when (操作):
        store.save_features(&room_id, &first).await.unwrap();
        store.save_features(&room_id, &second).await.unwrap();

        // then (期待する結果):
        let stored = store.features_for(&room_id).await;
        assert_eq!(stored.get("voice"), Some(&true));
        assert_eq!(stored.get("ai"), Some(&true));
    }
}
