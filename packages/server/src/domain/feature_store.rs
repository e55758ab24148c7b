//! External feature-toggle store.
//!
//! The core only notifies the store when a `featureUpdate` is broadcast in a
//! room; it never reads flags back.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::{FeatureStoreError, RoomId};

/// Feature name -> enabled
pub type FeatureFlags = BTreeMap<String, bool>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Persist the flags for the room's session
    async fn save_features(
        &self,
        room_id: &RoomId,
        features: &FeatureFlags,
    ) -> Result<(), FeatureStoreError>;
}
